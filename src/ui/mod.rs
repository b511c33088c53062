pub mod gantt_chart;
pub mod task_dialog;
pub mod task_tree;
pub mod theme;
pub mod toolbar;
