/// Issues transaction sequence numbers.
///
/// Numbers run `1..=255` and wrap back to `1`. Zero is reserved for
/// uncorrelated messages and is never issued.
#[derive(Debug, Clone, Default)]
pub struct SequenceGenerator {
    last: u8,
}

impl SequenceGenerator {
    /// A generator whose first number is `1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator that continues after `last`.
    pub fn starting_after(last: u8) -> Self {
        Self { last }
    }

    /// Advance and return the next sequence number.
    pub fn next_seq(&mut self) -> u8 {
        self.last = match self.last {
            u8::MAX => 1,
            n => n + 1,
        };
        self.last
    }

    /// The most recently issued number, if any.
    pub fn last(&self) -> Option<u8> {
        (self.last != 0).then_some(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_one() {
        let mut seq = SequenceGenerator::new();
        assert_eq!(seq.last(), None);
        assert_eq!(seq.next_seq(), 1);
        assert_eq!(seq.next_seq(), 2);
        assert_eq!(seq.last(), Some(2));
    }

    #[test]
    fn wraps_to_one_skipping_zero() {
        let mut seq = SequenceGenerator::starting_after(254);
        assert_eq!(seq.next_seq(), 255);
        assert_eq!(seq.next_seq(), 1);
    }

    #[test]
    fn never_issues_zero() {
        let mut seq = SequenceGenerator::new();
        for _ in 0..1000 {
            assert_ne!(seq.next_seq(), 0);
        }
    }
}
