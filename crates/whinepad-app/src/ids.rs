// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(RecordId);
entity_id!(SubscriberId);

/// Hands out monotonically increasing ids for one session.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn next_record(&mut self) -> RecordId {
        let id = RecordId::new(self.next);
        self.next += 1;
        id
    }

    pub fn next_subscriber(&mut self) -> SubscriberId {
        let id = SubscriberId::new(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::{IdAllocator, RecordId};

    #[test]
    fn allocator_never_repeats() {
        let mut ids = IdAllocator::default();
        let first = ids.next_record();
        let second = ids.next_record();
        assert_ne!(first, second);
        assert!(second > first);
        assert_eq!(RecordId::from(first.get()), first);
    }
}
