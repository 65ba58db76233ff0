use ahash::AHashMap;

/// Deduplicated strings referenced by [`ValueType::String`](crate::ValueType::String) values
#[derive(Debug, Default, Clone)]
pub struct StringPool {
    strings: Vec<String>,
    index: AHashMap<String, u32>,
}

impl StringPool {
    /// Add `s` to the pool, returning its index; equal strings share one index
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(idx) = self.index.get(s) {
            return *idx;
        }

        let idx = self.strings.len() as u32;
        self.strings.push(s.to_owned());
        self.index.insert(s.to_owned(), idx);
        idx
    }

    #[inline]
    pub fn get(&self, idx: u32) -> Option<&str> {
        self.strings.get(idx as usize).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
