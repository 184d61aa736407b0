//! Relation triples - graph memory entries.

use serde::{Deserialize, Serialize};

/// A typed entity-to-entity association.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RelationTriple {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl RelationTriple {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// Stable composite key for storage.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.subject, self.relation, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triple_key() {
        let triple = RelationTriple::new("alice", "manages", "platform-team");
        assert_eq!(triple.key(), "alice|manages|platform-team");
    }
}
