//! Prometheus metrics served at `/metrics`.
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    turns: IntCounterVec,
    failures: IntCounter,
    generation_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let turns = IntCounterVec::new(
            Opts::new("tina_turns_total", "Completed interview turns by resulting stage"),
            &["stage"],
        )?;
        let failures = IntCounter::new(
            "tina_turn_failures_total",
            "Turns that failed with a server error",
        )?;
        let generation_seconds = Histogram::with_opts(HistogramOpts::new(
            "tina_generation_seconds",
            "Wall time of turns that called the generation backend",
        ))?;

        registry.register(Box::new(turns.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(generation_seconds.clone()))?;

        Ok(Self {
            registry,
            turns,
            failures,
            generation_seconds,
        })
    }

    pub fn observe_turn(&self, stage: &str, generated: bool, seconds: f64) {
        self.turns.with_label_values(&[stage]).inc();
        if generated {
            self.generation_seconds.observe(seconds);
        }
    }

    pub fn observe_failure(&self) {
        self.failures.inc();
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_counts() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_turn("asking_follow_ups", true, 0.25);
        metrics.observe_turn("asking_follow_ups", true, 0.5);
        metrics.observe_turn("pre_feedback", false, 0.0);
        metrics.observe_failure();

        let text = metrics.encode().unwrap();
        assert!(text.contains("tina_turns_total{stage=\"asking_follow_ups\"} 2"));
        assert!(text.contains("tina_turn_failures_total 1"));
        assert!(text.contains("tina_generation_seconds_count 2"));
    }
}
