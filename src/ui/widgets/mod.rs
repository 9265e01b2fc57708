// src/ui/widgets/mod.rs

pub mod check_list;
pub mod disclaimer_popup;
pub mod footer;
pub mod input;
pub mod report_popup;
pub mod results_view;
pub mod summary;
