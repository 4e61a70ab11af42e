use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use log::info;

use weather_router::engine::constraints::ConstraintSet;
use weather_router::engine::field::VectorField;
use weather_router::engine::polar::PerformanceModel;
use weather_router::parsers::polars::PolarTable;
use weather_router::{Coordinate, CurrentData, RouteConfig, RouteMap, WindData};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let polar_path = args.next().unwrap_or_else(|| "data/imoca_60.csv".into());

    // Off the coast of Brittany, towards the Azores.
    let start = Coordinate::new(48.0, -5.0);
    let destination = Coordinate::new(40.0, -10.0);

    let table = PolarTable::load_from_csv(&polar_path)
        .with_context(|| format!("loading polar {polar_path}"))?;
    let model = Arc::new(PerformanceModel::new(table, 40.0, 5.0));

    // Uniform 20 kts from North stands in for a decoded forecast; a real
    // record-set plugs in through VectorField::from_grid.
    let field = Arc::new(VectorField::uniform(
        WindData { u: 0.0, v: -10.288 },
        CurrentData { u: 0.0, v: 0.0 },
    ));
    let constraints = Arc::new(ConstraintSet::default());

    let mut config = RouteConfig::new(start, Some(destination));
    config.step_seconds = 3600.0;
    config.max_duration_seconds = 7.0 * 24.0 * 3600.0;
    config.arrival_tolerance_m = 10_000.0;

    let mut map = RouteMap::new(config, field, model, constraints)?;

    let wall = Instant::now();
    let mut step = 0u32;
    while !map.status().is_terminal() {
        step += 1;
        let status = map.step();
        let frontier = map.latest_frontier_geometry();
        info!(
            "step {step}: {:?}, frontier {} points, {:.1}s elapsed wall time",
            status,
            frontier.len(),
            wall.elapsed().as_secs_f64()
        );
    }

    info!("Final status: {:?}", map.status());
    if let Some(route) = map.best_route() {
        info!("Best route, {} points:", route.len());
        for point in route {
            info!("  {:.4}, {:.4}", point.lat, point.lon);
        }
    }

    Ok(())
}
