//! # Timepulse workspace
//!
//! Umbrella crate re-exporting the workspace members:
//!
//! - [`pulse_math`]: sliding windows and regression metrics over slices
//! - [`timepulse`]: date-indexed tables, calendar alignment, lag features,
//!   stratified splits, models and the end-to-end pipeline
//!
//! ## Example
//!
//! ```
//! use timepulse_workspace::pulse_math::{evaluate_preds, make_windows};
//!
//! let series: Vec<f64> = (1..=12).map(f64::from).collect();
//! let (windows, labels) = make_windows(&series, 5, 1).unwrap();
//! assert_eq!(windows.len(), 7);
//! assert_eq!(labels.get(6), Some(&[12.0][..]));
//!
//! let report = evaluate_preds(&[2.0, 3.0, 5.0, 7.0], &[2.5, 3.5, 4.5, 6.5]).unwrap();
//! assert!((report.mae - 0.5).abs() < 1e-6);
//! ```

pub use pulse_math;
pub use timepulse;
