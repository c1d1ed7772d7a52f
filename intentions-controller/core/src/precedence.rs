use crate::{identifier::Exactness, intention::Intention};

/// Computes the precedence of an intention from the exactness of its tuples.
///
/// Destination exactness dominates: every `ns/name` destination outranks every `ns/*`
/// destination, which outranks `*/*`. Within a destination shape, a more exact source ranks
/// higher. This yields nine levels, `1..=9`:
///
/// ```text
///              src */*   src ns/*   src ns/name
/// dst ns/name     7         8          9
/// dst ns/*        4         5          6
/// dst */*         1         2          3
/// ```
pub fn precedence(source: Exactness, destination: Exactness) -> u32 {
    // The highest precedence reachable for the destination's shape.
    let max = match destination {
        Exactness::Full => 9,
        Exactness::Namespace => 6,
        Exactness::None => 3,
    };

    max - (2 - source.count())
}

// === impl Intention ===

impl Intention {
    /// Recomputes `precedence` from the current source and destination.
    ///
    /// Must be called after any change to the tuples and before the intention is hashed.
    pub fn update_precedence(&mut self) {
        let source = Exactness::of(&self.source_ns, &self.source_name);
        let destination = Exactness::of(&self.destination_ns, &self.destination_name);
        self.precedence = precedence(source, destination);
    }
}
