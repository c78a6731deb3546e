pub mod csv_adapter;
pub mod file_config_adapter;
pub mod svg_report;
