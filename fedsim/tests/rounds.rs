use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn};

use fedsim::{
    Coordinator, EvalOutcome, Execution, FedError, FederatedClient, FitOutcome, ParameterSet,
    Weighting,
};

fn initial_params() -> ParameterSet {
    ParameterSet::new(vec![
        ArrayD::from_elem(IxDyn(&[4]), 1.0),
        ArrayD::from_elem(IxDyn(&[2, 2]), 2.0),
    ])
}

/// Scripted client: records every parameter set it receives and answers
/// `fit` with the received values shifted by a per-client constant.
struct ScriptedClient {
    id: usize,
    bump: f32,
    samples: usize,
    /// When set, `fit` returns a single wrongly shaped tensor instead.
    misshapen: bool,
    /// When set, `fit` fails outright.
    failing: bool,
    current: ParameterSet,
    seen_eval: Vec<ParameterSet>,
    seen_fit: Vec<ParameterSet>,
}

impl ScriptedClient {
    fn new(id: usize, bump: f32, samples: usize) -> Self {
        Self {
            id,
            bump,
            samples,
            misshapen: false,
            failing: false,
            current: initial_params(),
            seen_eval: Vec::new(),
            seen_fit: Vec::new(),
        }
    }

    fn misshapen(mut self) -> Self {
        self.misshapen = true;
        self
    }

    fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

impl FederatedClient for ScriptedClient {
    fn id(&self) -> usize {
        self.id
    }

    fn get_parameters(&self) -> ParameterSet {
        self.current.clone()
    }

    fn set_parameters(&mut self, params: &ParameterSet) -> Result<(), FedError> {
        self.current = params.clone();
        Ok(())
    }

    fn fit(&mut self, params: &ParameterSet) -> Result<FitOutcome, FedError> {
        self.seen_fit.push(params.clone());

        if self.failing {
            return Err(FedError::EmptyUpdates);
        }
        if self.misshapen {
            return Ok(FitOutcome {
                params: ParameterSet::new(vec![ArrayD::zeros(IxDyn(&[3]))]),
                samples: self.samples,
                metrics: BTreeMap::new(),
            });
        }

        let tensors = params.tensors().iter().map(|t| t + self.bump).collect();
        self.current = ParameterSet::new(tensors);
        Ok(FitOutcome {
            params: self.current.clone(),
            samples: self.samples,
            metrics: BTreeMap::new(),
        })
    }

    fn evaluate(&mut self, params: &ParameterSet) -> Result<EvalOutcome, FedError> {
        self.seen_eval.push(params.clone());
        let mut metrics = BTreeMap::new();
        metrics.insert("accuracy".to_string(), 1.0);
        Ok(EvalOutcome { loss: 0.5, samples: self.samples, metrics })
    }
}

#[test]
fn every_client_sees_the_pre_training_parameters() {
    let clients = vec![
        ScriptedClient::new(0, 1.0, 10),
        ScriptedClient::new(1, 2.0, 10),
        ScriptedClient::new(2, 3.0, 10),
    ];
    let initial = initial_params();
    let mut coordinator =
        Coordinator::new(clients, initial.clone(), Weighting::Uniform, Execution::Sequential);

    let history = coordinator.run(2).unwrap();
    assert_eq!(history.len(), 2);

    // the mean bump is 2.0, so after round t the global set is
    // initial + (t + 1) * 2.0 elementwise
    let after_round_0 =
        ParameterSet::new(initial.tensors().iter().map(|t| t + 2.0).collect::<Vec<_>>());

    for client in coordinator.clients() {
        assert_eq!(client.seen_eval.len(), 2);
        assert_eq!(client.seen_fit.len(), 2);

        // within a round, evaluate and fit receive the same parameters
        assert_eq!(client.seen_eval[0], client.seen_fit[0]);
        assert_eq!(client.seen_eval[1], client.seen_fit[1]);

        // round 0 broadcasts the initial set, round 1 the round-0 aggregate
        assert_eq!(client.seen_eval[0], initial);
        assert_eq!(client.seen_eval[1], after_round_0);
    }

    let after_round_1 =
        ParameterSet::new(initial.tensors().iter().map(|t| t + 4.0).collect::<Vec<_>>());
    assert_eq!(*coordinator.global(), after_round_1);
}

#[test]
fn the_schema_survives_aggregation() {
    let clients = vec![ScriptedClient::new(0, 0.5, 4), ScriptedClient::new(1, -0.5, 4)];
    let initial = initial_params();
    let schema = initial.schema();
    let mut coordinator =
        Coordinator::new(clients, initial, Weighting::BySamples, Execution::Sequential);

    coordinator.run(2).unwrap();
    assert_eq!(coordinator.global().schema(), schema);
}

#[test]
fn round_metrics_keep_registration_order() {
    let clients = vec![
        ScriptedClient::new(0, 0.0, 7),
        ScriptedClient::new(1, 0.0, 9),
        ScriptedClient::new(2, 0.0, 11),
    ];
    let mut coordinator =
        Coordinator::new(clients, initial_params(), Weighting::Uniform, Execution::Sequential);

    let history = coordinator.run(1).unwrap();
    let evals = &history[0].evals;
    assert_eq!(evals.iter().map(|e| e.client).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(evals.iter().map(|e| e.samples).collect::<Vec<_>>(), vec![7, 9, 11]);
    assert_eq!(history[0].round, 0);
}

#[test]
fn a_failing_client_aborts_the_run_with_context() {
    let clients = vec![ScriptedClient::new(0, 1.0, 4), ScriptedClient::new(1, 1.0, 4).failing()];
    let mut coordinator =
        Coordinator::new(clients, initial_params(), Weighting::Uniform, Execution::Sequential);

    let err = coordinator.run(3).unwrap_err();
    assert!(matches!(err, FedError::Client { id: 1, round: 0, .. }));

    // the healthy client was still evaluated before the abort
    assert_eq!(coordinator.clients()[0].seen_eval.len(), 1);
}

#[test]
fn a_misshapen_update_fails_aggregation() {
    let clients = vec![ScriptedClient::new(0, 1.0, 4), ScriptedClient::new(1, 1.0, 4).misshapen()];
    let mut coordinator =
        Coordinator::new(clients, initial_params(), Weighting::Uniform, Execution::Sequential);

    let err = coordinator.run_round().unwrap_err();
    assert!(matches!(err, FedError::ShapeMismatch { slot: 0, .. }));
}

#[test]
fn zero_registered_clients_fail_at_aggregation() {
    let mut coordinator = Coordinator::new(
        Vec::<ScriptedClient>::new(),
        initial_params(),
        Weighting::Uniform,
        Execution::Sequential,
    );

    let err = coordinator.run(1).unwrap_err();
    assert!(matches!(err, FedError::EmptyUpdates));
}
