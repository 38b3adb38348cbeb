//! Shared helpers for tables and files

pub mod frame;
pub mod io;

pub use frame::{column_names, documents_to_frame, frame_to_array, present_values, target_array, train_test_split};
pub use io::{ensure_parent, load_object, read_csv, save_object, write_csv, write_json, write_yaml};
