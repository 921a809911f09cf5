/// 算法模块综合测试
///
/// 覆盖距离度量、单通道卡尔曼滤波、滤波层与 kNN 定位模型的性质

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use knnloc::algorithms::*;
    use ndarray::{array, s, Array2, Axis};

    fn metrics() -> Vec<Metric> {
        vec![
            Metric::Euclidean,
            Metric::Manhattan,
            // 切比雪夫距离作为自定义度量
            Metric::custom("chebyshev", |a, b| {
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x - y).abs())
                    .fold(0.0, f64::max)
            }),
        ]
    }

    fn fingerprints() -> Array2<f64> {
        array![
            [-50.0, -72.0, -81.0],
            [-55.0, -70.0, -90.0],
            [-68.0, -61.0, -77.0],
            [-80.0, -58.0, -66.0],
            [-50.0, -72.0, -81.0],
        ]
    }

    // ========================================================================
    // 距离度量
    // ========================================================================

    #[test]
    fn test_pairwise_matches_rowwise() {
        let a = fingerprints();
        let b = array![[-60.0, -60.0, -60.0], [-50.0, -72.0, -81.0]];

        for metric in metrics() {
            let full = pairwise(a.view(), b.view(), &metric).unwrap();
            assert_eq!(full.dim(), (5, 2));
            for i in 0..a.nrows() {
                for j in 0..b.nrows() {
                    let single = rowwise(
                        a.slice(s![i..i + 1, ..]),
                        b.slice(s![j..j + 1, ..]),
                        &metric,
                    )
                    .unwrap();
                    assert_abs_diff_eq!(full[[i, j]], single[0], epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_euclidean_symmetric_zero_diagonal() {
        let a = fingerprints();
        let d = pairwise(a.view(), a.view(), &Metric::Euclidean).unwrap();
        for i in 0..a.nrows() {
            assert_eq!(d[[i, i]], 0.0);
            for j in 0..a.nrows() {
                assert_abs_diff_eq!(d[[i, j]], d[[j, i]], epsilon = 1e-9);
            }
        }
        let same = rowwise(a.view(), a.view(), &Metric::Euclidean).unwrap();
        assert!(same.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_distances_non_negative_and_zero_only_for_identical() {
        let a = fingerprints();
        for metric in [Metric::Euclidean, Metric::Manhattan] {
            let d = pairwise(a.view(), a.view(), &metric).unwrap();
            for i in 0..a.nrows() {
                for j in 0..a.nrows() {
                    assert!(d[[i, j]] >= 0.0);
                    assert_eq!(d[[i, j]] == 0.0, a.row(i) == a.row(j), "{metric} ({i}, {j})");
                }
            }
        }
    }

    #[test]
    fn test_known_distances() {
        let a = array![[0.0, 0.0]];
        let b = array![[3.0, 4.0]];
        assert_eq!(rowwise(a.view(), b.view(), &Metric::Euclidean).unwrap()[0], 5.0);
        assert_eq!(rowwise(a.view(), b.view(), &Metric::Manhattan).unwrap()[0], 7.0);
        assert_eq!(pairwise(a.view(), b.view(), &Metric::Euclidean).unwrap()[[0, 0]], 5.0);
    }

    #[test]
    fn test_column_mismatch() {
        let a = array![[0.0, 0.0]];
        let b = array![[0.0, 0.0, 0.0]];
        assert!(matches!(
            pairwise(a.view(), b.view(), &Metric::Manhattan),
            Err(LocalizerError::ShapeMismatch { .. })
        ));
    }

    // ========================================================================
    // 卡尔曼滤波
    // ========================================================================

    #[test]
    fn test_filter_infinite_measurement_noise_never_moves() {
        let mut filter = ChannelFilter::new(0.0, f64::INFINITY).unwrap();
        assert_eq!(filter.update(-60.0), -60.0);
        for z in [-40.0, -90.0, f64::NAN, -10.0] {
            assert_eq!(filter.update(z), -60.0);
        }
    }

    #[test]
    fn test_filter_noiseless_sensor_follows_measurements() {
        for q in [0.04, 0.0] {
            let mut filter = ChannelFilter::new(q, 0.0).unwrap();
            for z in [-60.0, -72.5, -55.25, -80.0, -61.0] {
                assert_eq!(filter.update(z), z, "Q={q}");
            }
        }
    }

    #[test]
    fn test_filter_missing_sample_scenario() {
        let mut filter = ChannelFilter::new(0.04, 4.0).unwrap();

        assert_eq!(filter.update(10.0), 10.0);
        assert_eq!(filter.variance(), INITIAL_VARIANCE);

        // 只预测：估计不变，方差增大
        assert_eq!(filter.update(f64::NAN), 10.0);
        let p_missing = filter.variance();
        assert_abs_diff_eq!(p_missing, 10.04, epsilon = 1e-12);

        assert_eq!(filter.update(10.0), 10.0);
        let p_corrected = filter.variance();
        assert!(p_corrected < p_missing && p_corrected > 0.0);

        assert_eq!(filter.update(10.0), 10.0);
        assert!(filter.variance() < p_corrected);
    }

    #[test]
    fn test_filter_layer_columns_are_independent() {
        let mut layer = KalmanFilterLayer::new(0.04, 4.0).unwrap();
        let x = array![
            [10.0, -60.0],
            [f64::NAN, -70.0],
            [10.0, -70.0],
            [10.0, f64::NAN],
        ];
        let out = layer.transform(x.view()).unwrap();

        assert_eq!(out.column(0), array![10.0, 10.0, 10.0, 10.0]);

        // 第二列单独用一个滤波器重放，结果应一致
        let mut single = ChannelFilter::new(0.04, 4.0).unwrap();
        let expected: Vec<f64> = x.column(1).iter().map(|&z| single.update(z)).collect();
        assert_eq!(out.column(1).to_vec(), expected);
        assert_eq!(out[[3, 1]], out[[2, 1]]);
    }

    #[test]
    fn test_filter_layer_state_carries_across_calls() {
        let mut layer = KalmanFilterLayer::default();
        layer.transform(array![[-60.0]].view()).unwrap();

        // 第二次调用延续上一次的状态，首行不再原样输出
        let continued = layer.transform(array![[-80.0]].view()).unwrap();
        assert!(continued[[0, 0]] > -80.0 && continued[[0, 0]] < -60.0);

        layer.reset();
        let fresh = layer.transform(array![[-80.0]].view()).unwrap();
        assert_eq!(fresh[[0, 0]], -80.0);
    }

    #[test]
    fn test_filter_layer_leading_missing_stays_missing() {
        let mut layer = KalmanFilterLayer::default();
        let out = layer.transform(array![[f64::NAN], [-70.0]].view()).unwrap();
        assert!(out[[0, 0]].is_nan());
        assert_eq!(out[[1, 0]], -70.0);
    }

    // ========================================================================
    // kNN 定位
    // ========================================================================

    #[test]
    fn test_knn_single_neighbor_exact_match() {
        let x = array![[0.0, 0.0], [10.0, 10.0]];
        let y = array![[0.0, 0.0], [1.0, 1.0]];

        let mut model = KnnLocalizer::new(1).unwrap();
        let pred = model
            .fit(x.view(), y.view())
            .unwrap()
            .predict(array![[0.0, 0.0]].view())
            .unwrap();
        assert_eq!(pred, array![[0.0, 0.0]]);
    }

    #[test]
    fn test_knn_all_neighbors_returns_label_mean() {
        let x = fingerprints();
        let y = array![[0.0, 0.0], [100.0, 0.0], [100.0, 200.0], [0.0, 200.0], [50.0, 50.0]];
        let mean = y.mean_axis(Axis(0)).unwrap();

        let mut model = KnnLocalizer::new(x.nrows()).unwrap();
        model.fit(x.view(), y.view()).unwrap();

        let queries = array![[-50.0, -72.0, -81.0], [-90.0, -90.0, -90.0], [0.0, 0.0, 0.0]];
        let pred = model.predict(queries.view()).unwrap();
        for row in pred.rows() {
            assert_eq!(row, pred.row(0));
            assert_abs_diff_eq!(row[0], mean[0], epsilon = 1e-9);
            assert_abs_diff_eq!(row[1], mean[1], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_knn_round_trip_on_training_data() {
        let x = fingerprints().slice(s![0..4, ..]).to_owned();
        let y = array![[0.0, 0.0], [120.0, 40.0], [300.0, 310.0], [640.0, 220.0]];

        for metric in metrics() {
            let mut model = KnnLocalizer::new(1).unwrap().with_metric(metric);
            let pred = model.fit(x.view(), y.view()).unwrap().predict(x.view()).unwrap();
            assert_eq!(pred, y);
        }
    }

    #[test]
    fn test_knn_averages_k_nearest() {
        let x = array![[0.0], [1.0], [2.0], [100.0]];
        let y = array![[0.0, 0.0], [2.0, 4.0], [4.0, 8.0], [1000.0, 1000.0]];
        let mut model = KnnLocalizer::new(3).unwrap().with_metric(Metric::Manhattan);
        let pred = model.fit(x.view(), y.view()).unwrap().predict(array![[1.0]].view()).unwrap();
        assert_eq!(pred, array![[2.0, 4.0]]);
    }

    #[test]
    fn test_knn_repeated_predict_is_deterministic() {
        let x = fingerprints();
        let y = array![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let mut model = KnnLocalizer::new(2).unwrap();
        model.fit(x.view(), y.view()).unwrap();

        let q = array![[-52.0, -71.0, -85.0], [-75.0, -60.0, -70.0]];
        let first = model.predict(q.view()).unwrap();
        let second = model.predict(q.view()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_knn_errors() {
        let x = array![[0.0, 0.0], [1.0, 1.0]];
        let y = array![[0.0, 0.0], [1.0, 1.0]];

        // X / y 行数不一致
        let mut model = KnnLocalizer::new(1).unwrap();
        assert!(matches!(
            model.fit(x.view(), y.slice(s![0..1, ..])),
            Err(LocalizerError::ShapeMismatch { .. })
        ));

        // 空训练集
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            model.fit(empty.view(), empty.view()),
            Err(LocalizerError::InvalidParameter { .. })
        ));
        assert!(!model.is_fitted());

        // k 超过训练样本数
        let mut big_k = KnnLocalizer::new(3).unwrap();
        big_k.fit(x.view(), y.view()).unwrap();
        assert!(matches!(
            big_k.predict(x.view()),
            Err(LocalizerError::InvalidParameter { name: "k", .. })
        ));

        // 查询列数不一致
        model.fit(x.view(), y.view()).unwrap();
        assert!(matches!(
            model.predict(array![[0.0, 0.0, 0.0]].view()),
            Err(LocalizerError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_knn_missing_reading_never_nearest() {
        let x = array![[f64::NAN, -90.0], [-50.0, -60.0]];
        let y = array![[999.0, 999.0], [1.0, 1.0]];
        let mut model = KnnLocalizer::new(1).unwrap();
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.predict(array![[-50.0, -60.0]].view()).unwrap(), array![[1.0, 1.0]]);

        let nb = model.kneighbors(array![[-50.0, -60.0]].view()).unwrap();
        assert_eq!(nb.indices, array![[1]]);
        assert_eq!(nb.distances, array![[0.0]]);
    }

    #[test]
    fn test_knn_failed_calls_leave_layer_state_untouched() {
        let x = array![[-80.0], [-40.0]];
        let y = array![[0.0, 0.0], [1.0, 1.0]];
        let mut model = KnnLocalizer::new(1)
            .unwrap()
            .with_layer(KalmanFilterLayer::default());

        // 未训练时预测失败，不推进滤波器
        assert_eq!(
            model.predict(array![[-60.0]].view()).unwrap_err(),
            LocalizerError::NotFitted
        );
        // X / y 行数不一致的训练同样不推进
        assert!(model.fit(x.view(), y.slice(s![0..1, ..])).is_err());

        model.fit(x.view(), y.view()).unwrap();
        let nb = model.kneighbors(array![[-80.0]].view()).unwrap();
        assert_eq!(nb.distances, array![[0.0]]);

        // 列数错误的预测在进入管线前被拒绝
        let layer_state = format!("{:?}", model.pipeline().layers()[0]);
        assert!(model.predict(array![[-80.0, -80.0]].view()).is_err());
        assert_eq!(format!("{:?}", model.pipeline().layers()[0]), layer_state);
    }

    #[test]
    fn test_knn_refit_overwrites_state() {
        let mut model = KnnLocalizer::new(1).unwrap();
        model.fit(array![[0.0]].view(), array![[1.0, 1.0]].view()).unwrap();
        model
            .fit(array![[0.0], [5.0]].view(), array![[7.0, 7.0], [9.0, 9.0]].view())
            .unwrap();
        assert_eq!(model.n_train(), 2);
        assert_eq!(model.predict(array![[0.0]].view()).unwrap(), array![[7.0, 7.0]]);
    }

    #[test]
    fn test_knn_with_filter_layer() {
        let x = array![[-50.0, -80.0], [-50.0, -80.0], [-80.0, -50.0], [-80.0, -50.0]];
        let y = array![[0.0, 0.0], [0.0, 0.0], [500.0, 500.0], [500.0, 500.0]];

        let mut model = KnnLocalizer::new(1)
            .unwrap()
            .with_layer(KalmanFilterLayer::new(0.04, 4.0).unwrap());
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.pipeline().len(), 1);

        // 重置后，首个查询行不经平滑直接参与匹配
        model.reset_layers();
        let pred = model.predict(array![[-50.0, -80.0]].view()).unwrap();
        assert_eq!(pred, array![[0.0, 0.0]]);
    }
}
