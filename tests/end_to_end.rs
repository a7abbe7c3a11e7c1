//! End-to-end training scenarios exercising the full public surface.

use learnkit::{
    FeedforwardNetwork, Matrix, MulticlassLogisticRegression, NearestNeighbors, Regression,
};

#[test]
fn linear_regression_recovers_a_line() {
    // y = 1000 + 200 * x
    let inputs = Matrix::from_rows(&[vec![5.0], vec![7.0], vec![9.0], vec![11.0], vec![13.0]])
        .unwrap();
    let targets = Matrix::from_rows(&[
        vec![2000.0],
        vec![2400.0],
        vec![2800.0],
        vec![3200.0],
        vec![3600.0],
    ])
    .unwrap();

    let mut model = Regression::linear();
    model.set_epochs(10000);
    model.set_learning_rate(0.02).unwrap();

    model.train(&inputs, &targets).unwrap();
    let predictions = model.predict(&inputs).unwrap();

    for row in 0..targets.row_count() {
        assert!(
            (predictions.get(row, 0) - targets.get(row, 0)).abs() < 0.01,
            "row {row}: predicted {}, wanted {}",
            predictions.get(row, 0),
            targets.get(row, 0)
        );
    }
}

#[test]
fn logistic_regression_orders_two_inputs() {
    // Target is 1 when the second input is higher than the first.
    let inputs = Matrix::from_rows(&[
        vec![1000.0, 1100.0],
        vec![4500.0, 3000.0],
        vec![700.0, 1300.0],
        vec![1150.0, 700.0],
        vec![1300.0, 1200.0],
        vec![600.0, 650.0],
    ])
    .unwrap();
    let targets = Matrix::from_rows(&[
        vec![1.0],
        vec![0.0],
        vec![1.0],
        vec![0.0],
        vec![0.0],
        vec![1.0],
    ])
    .unwrap();

    let mut model = Regression::logistic();
    model.set_epochs(1000);
    model.set_learning_rate(0.01).unwrap();

    model.train(&inputs, &targets).unwrap();
    let predictions = model.predict(&inputs).unwrap();

    for row in 0..targets.row_count() {
        let prediction = predictions.get(row, 0);
        if targets.get(row, 0) == 1.0 {
            assert!(prediction > 0.9, "row {row}: {prediction}");
        } else {
            assert!(prediction < 0.1, "row {row}: {prediction}");
        }
    }
}

#[test]
fn one_vs_all_finds_the_highest_input() {
    let inputs = Matrix::from_rows(&[
        vec![4500.0, 1200.0, 3000.0],
        vec![700.0, 890.0, 800.0],
        vec![700.0, 1200.0, 1300.0],
        vec![1150.0, 600.0, 700.0],
        vec![600.0, 1500.0, 1650.0],
        vec![400.0, 401.0, 400.0],
    ])
    .unwrap();
    let targets = Matrix::from_rows(&[
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
        vec![1.0, 0.0, 0.0],
        vec![0.0, 0.0, 1.0],
        vec![0.0, 1.0, 0.0],
    ])
    .unwrap();

    let mut model = MulticlassLogisticRegression::new();
    model.set_epochs(10000);
    model.set_learning_rate(0.1).unwrap();

    model.train(&inputs, &targets).unwrap();
    let predictions = model.predict(&inputs).unwrap();
    assert_eq!(predictions.row_count(), 6);
    assert_eq!(predictions.column_count(), 3);

    let predicted_classes = predictions.max_row_indices();
    let expected_classes = targets.max_row_indices();
    for row in 0..targets.row_count() {
        assert_eq!(
            predicted_classes.get(row, 0),
            expected_classes.get(row, 0),
            "row {row}"
        );
    }
}

#[test]
fn network_learns_xnor() {
    let inputs = Matrix::from_rows(&[
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ])
    .unwrap();
    let targets = Matrix::from_rows(&[vec![1.0], vec![0.0], vec![0.0], vec![1.0]]).unwrap();

    let mut network = FeedforwardNetwork::new_with_seed(&[2, 5, 1], 0).unwrap();
    network.set_epochs(1000);
    network.set_learning_rate(1.0).unwrap();

    network.train(&inputs, &targets).unwrap();
    let predictions = network.predict(&inputs).unwrap();

    assert!(predictions.get(0, 0) > 0.9, "0 XNOR 0: {}", predictions.get(0, 0));
    assert!(predictions.get(1, 0) < 0.1, "0 XNOR 1: {}", predictions.get(1, 0));
    assert!(predictions.get(2, 0) < 0.1, "1 XNOR 0: {}", predictions.get(2, 0));
    assert!(predictions.get(3, 0) > 0.9, "1 XNOR 1: {}", predictions.get(3, 0));
}

#[test]
fn gradient_check_passes_on_a_deep_untrained_network() {
    let mut network = FeedforwardNetwork::new_with_seed(&[40, 40, 40, 40, 40], 0).unwrap();

    let inputs = Matrix::rand(2, 40, 1.0, Some(1));
    let mut targets = Matrix::rand(2, 40, 0.5, Some(2));
    targets.add_scalar(0.5);

    assert!(network.check_gradients(&inputs, &targets).unwrap());
}

#[test]
fn nearest_neighbors_averages_boundary_ties() {
    let inputs = Matrix::from_rows(&[
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
        vec![1.0, 1.0],
        vec![2.0, 2.0],
    ])
    .unwrap();
    let targets = Matrix::from_rows(&[
        vec![0.0, 0.0, 0.0, 1.0],
        vec![0.0, 0.0, 1.0, 0.0],
        vec![0.0, 1.0, 0.0, 0.0],
        vec![1.0, 0.0, 0.0, 0.0],
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.0, 1.0],
    ])
    .unwrap();

    let mut model = NearestNeighbors::new();
    model.set_neighbor_count(1).unwrap();
    model.train(&inputs, &targets).unwrap();

    let queries = Matrix::from_rows(&[
        vec![0.5, 0.5],
        vec![1.5, 1.5],
        vec![1.75, 1.75],
    ])
    .unwrap();
    let predictions = model.predict(&queries).unwrap();

    let expected = [
        [0.4, 0.2, 0.2, 0.2],
        [2.0 / 3.0, 0.0, 0.0, 1.0 / 3.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    for (row, expected_row) in expected.iter().enumerate() {
        for (col, &value) in expected_row.iter().enumerate() {
            assert!(
                (predictions.get(row, col) - value).abs() < 1e-12,
                "({row}, {col}): got {}",
                predictions.get(row, col)
            );
        }
    }
}

#[test]
fn regression_training_is_resumable() {
    let inputs = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
    let targets = Matrix::from_rows(&[vec![2.0], vec![4.0], vec![6.0]]).unwrap();

    let mut in_one_go = Regression::linear();
    in_one_go.set_epochs(500);
    in_one_go.set_learning_rate(0.05).unwrap();
    in_one_go.train(&inputs, &targets).unwrap();

    let mut in_two_steps = Regression::linear();
    in_two_steps.set_epochs(250);
    in_two_steps.set_learning_rate(0.05).unwrap();
    in_two_steps.train(&inputs, &targets).unwrap();
    in_two_steps.train(&inputs, &targets).unwrap();

    let a = in_one_go.hypothesis().unwrap();
    let b = in_two_steps.hypothesis().unwrap();
    assert!((a.get(0, 0) - b.get(0, 0)).abs() < 1e-12);
    assert!((a.get(1, 0) - b.get(1, 0)).abs() < 1e-12);
}

#[test]
fn checkpointed_hypothesis_reproduces_predictions() {
    let inputs = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    let targets = Matrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();

    let mut trained = Regression::logistic();
    trained.set_epochs(50);
    trained.train(&inputs, &targets).unwrap();

    let mut restored = Regression::logistic();
    restored.set_hypothesis(trained.hypothesis().unwrap().clone());

    assert_eq!(
        trained.predict(&inputs).unwrap(),
        restored.predict(&inputs).unwrap()
    );
}
