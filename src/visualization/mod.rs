mod charts;
mod tables;

pub use charts::{
    format_combined_overlay, format_growth_overlay, format_residual_facets, model_glyph,
    print_combined_overlay, print_growth_overlay, print_residual_facets,
};
pub use tables::{
    format_convergence_table, format_metrics_table, format_parameter_table,
    format_quality_report, format_ranking_table, format_summary_table, print_convergence_table,
    print_metrics_table, print_parameter_table, print_quality_report, print_ranking_table,
    print_summary_table,
};
