//! In-memory statement accumulation.

use oxigraph::model::{Graph, Triple};

/// Length of the ` .\n` terminator of an N-Triples line.
const NTRIPLES_TERMINATOR: u64 = 3;

/// Collects the statements of consecutive records into one deduplicating
/// graph and tracks its approximate serialized size.
///
/// The size is the summed N-Triples byte length of the distinct statements
/// held, so it never decreases until the graph is taken.
#[derive(Debug, Default)]
pub struct GraphAccumulator {
    graph: Graph,
    size: u64,
    records: usize,
}

impl GraphAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every statement of one record.
    ///
    /// Statements already present are ignored and don't count towards the size.
    ///
    /// # Returns
    /// Approximate serialized size of the graph in bytes
    pub fn add_record_statements<I>(&mut self, statements: I) -> u64
    where
        I: IntoIterator<Item = Triple>,
    {
        for statement in statements {
            if self.graph.insert(&statement) {
                self.size += statement.to_string().len() as u64 + NTRIPLES_TERMINATOR;
            }
        }
        self.records += 1;
        self.size
    }

    /// Hand over the accumulated graph and start a fresh one.
    pub fn take(&mut self) -> Graph {
        self.size = 0;
        self.records = 0;
        std::mem::take(&mut self.graph)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Records added since the graph was last taken.
    pub fn record_count(&self) -> usize {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{Literal, NamedNode};

    fn statement(subject: &str, value: &str) -> Triple {
        Triple::new(
            NamedNode::new_unchecked(format!("https://example.org/pid/{}", subject)),
            NamedNode::new_unchecked("https://schema.org/headline"),
            Literal::new_simple_literal(value),
        )
    }

    #[test]
    fn test_size_is_ntriples_length() {
        let mut graph = GraphAccumulator::new();
        let t = statement("1001", "Gattaca");
        let expected = format!("{} .\n", t).len() as u64;

        assert_eq!(graph.add_record_statements(vec![t]), expected);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.record_count(), 1);
    }

    #[test]
    fn test_duplicates_do_not_grow_size() {
        let mut graph = GraphAccumulator::new();
        let first = graph.add_record_statements(vec![statement("1", "a"), statement("1", "a")]);
        let second = graph.add_record_statements(vec![statement("1", "a")]);

        assert_eq!(first, second);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.record_count(), 2);
    }

    #[test]
    fn test_size_is_monotonic() {
        let mut graph = GraphAccumulator::new();
        let mut last = 0;
        for i in 0..20 {
            let statements = vec![statement(&i.to_string(), "x"), statement("0", "x")];
            let size = graph.add_record_statements(statements);
            assert!(size >= last);
            last = size;
        }
    }

    #[test]
    fn test_take_resets() {
        let mut graph = GraphAccumulator::new();
        graph.add_record_statements(vec![statement("1", "a"), statement("2", "b")]);

        let taken = graph.take();
        assert_eq!(taken.len(), 2);
        assert!(graph.is_empty());
        assert_eq!(graph.size(), 0);
        assert_eq!(graph.record_count(), 0);
    }

    #[test]
    fn test_empty_record_still_counts() {
        let mut graph = GraphAccumulator::new();
        assert_eq!(graph.add_record_statements(Vec::new()), 0);
        assert_eq!(graph.record_count(), 1);
    }
}
