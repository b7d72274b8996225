use std::sync::{Arc, RwLock};

/// Process-wide cache of the latest applied block. Written only by the ingest task after a block
/// commits; readers get the last published value without touching the database.
#[derive(Clone, Default)]
pub struct ChainTip {
    inner: Arc<RwLock<Option<(u64, String)>>>,
}

impl ChainTip {
    pub fn new() -> Self {
        ChainTip {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    pub fn get(&self) -> Option<(u64, String)> {
        self.inner.read().unwrap().clone()
    }

    pub fn set(&self, tip: Option<(u64, String)>) {
        *self.inner.write().unwrap() = tip;
    }
}

#[cfg(test)]
mod test {
    use super::ChainTip;

    #[test]
    fn publishes_and_clears_tip() {
        let tip = ChainTip::new();
        assert_eq!(tip.get(), None);
        tip.set(Some((767430, "abc".to_string())));
        assert_eq!(tip.get(), Some((767430, "abc".to_string())));
        let reader = tip.clone();
        tip.set(None);
        assert_eq!(reader.get(), None);
    }
}
