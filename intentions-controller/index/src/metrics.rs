use crate::{Error, IntentionOp};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

#[derive(Clone, Default)]
pub struct IndexMetrics {
    intentions: Gauge,
    applies: Family<OpLabels, Counter>,
    rejects: Family<RejectLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OpLabels {
    op: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RejectLabels {
    op: String,
    reason: String,
}

impl IndexMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let intentions = Gauge::default();
        prom.register(
            "intentions",
            "Gauge of the number of intentions in the index",
            intentions.clone(),
        );

        let applies = Family::default();
        prom.register(
            "applies",
            "Count of writes applied to the index",
            applies.clone(),
        );

        let rejects = Family::default();
        prom.register(
            "rejects",
            "Count of writes rejected by the index",
            rejects.clone(),
        );

        Self {
            intentions,
            applies,
            rejects,
        }
    }

    pub(crate) fn set_size(&self, size: usize) {
        self.intentions.set(size as i64);
    }

    pub(crate) fn applied(&self, op: IntentionOp) {
        self.applies
            .get_or_create(&OpLabels {
                op: op.to_string(),
            })
            .inc();
    }

    pub(crate) fn rejected(&self, op: IntentionOp, error: &Error) {
        self.rejects
            .get_or_create(&RejectLabels {
                op: op.to_string(),
                reason: error.reason().to_string(),
            })
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Index;
    use intentions_controller_core::{Action, Intention, SourceType};
    use prometheus_client::encoding::text::encode;

    fn mk(id: &str, source: &str) -> Intention {
        Intention {
            id: id.to_string(),
            source_ns: "default".to_string(),
            source_name: source.to_string(),
            destination_ns: "default".to_string(),
            destination_name: "db".to_string(),
            source_type: Some(SourceType::Registry),
            action: Some(Action::Allow),
            ..Default::default()
        }
    }

    #[test]
    fn records_applies_and_rejects() {
        let mut prom = Registry::default();
        let index = Index::shared(IndexMetrics::register(&mut prom));

        index
            .write()
            .apply(IntentionOp::Create, mk("a", "web"))
            .expect("create must succeed");
        index
            .write()
            .apply(IntentionOp::Create, mk("b", "api"))
            .expect("create must succeed");
        index
            .write()
            .apply(IntentionOp::Delete, mk("b", "api"))
            .expect("delete must succeed");
        index
            .write()
            .apply(IntentionOp::Create, mk("c", "web"))
            .expect_err("duplicate must be rejected");

        let mut text = String::new();
        encode(&mut text, &prom).expect("metrics must encode");
        assert!(text.contains("\nintentions 1\n"), "{text}");
        assert!(text.contains("applies_total{op=\"create\"} 2"), "{text}");
        assert!(text.contains("applies_total{op=\"delete\"} 1"), "{text}");
        assert!(
            text.contains("rejects_total{op=\"create\",reason=\"duplicate\"} 1"),
            "{text}"
        );
    }
}
