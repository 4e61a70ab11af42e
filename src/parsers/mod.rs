pub mod polars;
