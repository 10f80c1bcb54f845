/// Diagnostic numbers reported by one client for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEval {
    pub client: usize,
    pub loss: f32,
    pub samples: usize,
    pub accuracy: f32,
}

/// Everything logged for a single round.
///
/// Evaluations run against the pre-training global parameters, so the
/// numbers for round `t` describe the model aggregated at the end of round
/// `t - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundMetrics {
    pub round: usize,
    pub evals: Vec<ClientEval>,
}

impl RoundMetrics {
    /// Plain mean loss across clients, NaN when no client reported.
    pub fn mean_loss(&self) -> f32 {
        if self.evals.is_empty() {
            return f32::NAN;
        }
        self.evals.iter().map(|e| e.loss).sum::<f32>() / self.evals.len() as f32
    }

    /// Plain mean accuracy across clients, NaN when no client reported.
    pub fn mean_accuracy(&self) -> f32 {
        if self.evals.is_empty() {
            return f32::NAN;
        }
        self.evals.iter().map(|e| e.accuracy).sum::<f32>() / self.evals.len() as f32
    }
}
