use pulse_math::windows::{make_windows, train_test_split_windows, WindowSet};
use rstest::rstest;

fn series(len: usize) -> Vec<f64> {
    (1..=len).map(|v| v as f64).collect()
}

#[rstest]
#[case(12, 5, 1)]
#[case(12, 3, 3)]
#[case(30, 7, 1)]
#[case(9, 8, 1)]
#[case(20, 1, 4)]
fn test_window_count_and_contiguity(
    #[case] len: usize,
    #[case] window_size: usize,
    #[case] horizon: usize,
) {
    let x = series(len);
    let (windows, labels) = make_windows(&x, window_size, horizon).unwrap();

    assert_eq!(windows.len(), len - window_size - horizon + 1);
    assert_eq!(labels.len(), windows.len());
    assert_eq!(windows.width(), window_size);
    assert_eq!(labels.width(), horizon);

    for (start, (window, label)) in windows.iter().zip(labels.iter()).enumerate() {
        assert_eq!(window, &x[start..start + window_size]);
        assert_eq!(label, &x[start + window_size..start + window_size + horizon]);
        // values are 1-based positions, so the label continues the window by one
        assert_eq!(label[0], window[window_size - 1] + 1.0);
    }
}

#[test]
fn test_twelve_values_window_five() {
    let x = series(12);
    let (windows, labels) = make_windows(&x, 5, 1).unwrap();

    assert_eq!(windows.len(), 7);
    assert_eq!(windows.get(0).unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(labels.get(0).unwrap(), &[6.0]);
    assert_eq!(windows.get(6).unwrap(), &[7.0, 8.0, 9.0, 10.0, 11.0]);
    assert_eq!(labels.get(6).unwrap(), &[12.0]);
}

#[test]
fn test_short_series_is_rejected() {
    let x = series(5);
    assert!(make_windows(&x, 5, 1).is_err());
    assert!(make_windows(&x, 0, 1).is_err());
    assert!(make_windows(&x, 2, 0).is_err());
}

#[rstest]
#[case(0.1)]
#[case(0.2)]
#[case(0.25)]
#[case(0.5)]
#[case(0.0)]
#[case(1.0)]
fn test_split_is_ordered_and_exhaustive(#[case] test_split: f64) {
    let x = series(40);
    let (windows, labels) = make_windows(&x, 7, 1).unwrap();
    let (train_w, test_w, train_l, test_l) =
        train_test_split_windows(&windows, &labels, test_split).unwrap();

    let expected_train = (windows.len() as f64 * (1.0 - test_split)).round() as usize;
    assert_eq!(train_w.len(), expected_train);
    assert_eq!(train_l.len(), expected_train);
    assert_eq!(train_w.len() + test_w.len(), windows.len());

    let rejoined: Vec<f64> = train_w
        .as_slice()
        .iter()
        .chain(test_w.as_slice())
        .copied()
        .collect();
    assert_eq!(rejoined, windows.as_slice());

    let rejoined_labels: Vec<f64> = train_l
        .as_slice()
        .iter()
        .chain(test_l.as_slice())
        .copied()
        .collect();
    assert_eq!(rejoined_labels, labels.as_slice());
}

#[test]
fn test_split_rounds_halves_away_from_zero() {
    let x = series(8);
    let (windows, labels) = make_windows(&x, 2, 1).unwrap();
    assert_eq!(windows.len(), 6);

    // 6 * 0.75 = 4.5
    let (train_w, test_w, _, _) = train_test_split_windows(&windows, &labels, 0.25).unwrap();

    assert_eq!(train_w.len(), 5);
    assert_eq!(test_w.len(), 1);
}

#[test]
fn test_split_validates_inputs() {
    let windows = WindowSet::new(2, vec![1.0, 2.0, 2.0, 3.0]).unwrap();
    let labels = WindowSet::new(1, vec![3.0]).unwrap();
    assert!(train_test_split_windows(&windows, &labels, 0.2).is_err());

    let labels = WindowSet::new(1, vec![3.0, 4.0]).unwrap();
    assert!(train_test_split_windows(&windows, &labels, 1.5).is_err());
    assert!(train_test_split_windows(&windows, &labels, -0.1).is_err());
}
