use crate::error::{CodecError, CodecResult};

/// Adaptive symbol frequencies stored in a Fenwick tree.
///
/// Every symbol starts with frequency 1, so a fresh model over `n` symbols
/// has a total of `n`. Frequencies only ever increase; the total is capped
/// at `u32::MAX`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FrequencyModel {
    tree: Vec<u32>,
    total: u32,
}

impl FrequencyModel {
    pub fn new(symbol_num: usize) -> CodecResult<Self> {
        if symbol_num < 1 || symbol_num > u32::MAX as usize {
            return Err(CodecError::invalid_argument(format!(
                "alphabet size must be between 1 and {}",
                u32::MAX
            )));
        }

        let mut model = Self {
            tree: vec![0; symbol_num + 1],
            total: 0,
        };
        for symbol in 0..symbol_num {
            model.increment_unchecked(symbol)?;
        }
        Ok(model)
    }

    #[inline]
    #[must_use]
    pub fn symbol_num(&self) -> usize {
        self.tree.len() - 1
    }

    #[inline]
    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn increment(&mut self, symbol: usize) -> CodecResult<()> {
        self.check_symbol(symbol)?;
        self.increment_unchecked(symbol)
    }

    /// Sum of the frequencies of all symbols with index lower than `symbol`.
    ///
    /// `symbol` may be equal to the alphabet size, in which case the total is
    /// returned.
    pub fn cumulative_count(&self, symbol: usize) -> CodecResult<u32> {
        if symbol > self.symbol_num() {
            return Err(CodecError::invalid_symbol(symbol, self.symbol_num()));
        }
        Ok(self.cumulative_count_unchecked(symbol))
    }

    pub fn frequency(&self, symbol: usize) -> CodecResult<u32> {
        self.check_symbol(symbol)?;
        Ok(self.cumulative_count_unchecked(symbol + 1) - self.cumulative_count_unchecked(symbol))
    }

    #[inline]
    pub(crate) fn check_symbol(&self, symbol: usize) -> CodecResult<()> {
        if symbol >= self.symbol_num() {
            Err(CodecError::invalid_symbol(symbol, self.symbol_num()))
        } else {
            Ok(())
        }
    }

    #[inline]
    pub(crate) fn increment_unchecked(&mut self, symbol: usize) -> CodecResult<()> {
        // every tree node is bounded by the total
        if self.total == u32::MAX {
            return Err(CodecError::InvalidState);
        }

        let n = self.symbol_num();
        let mut i = symbol + 1;
        while i <= n {
            self.tree[i] += 1;
            i += i & i.wrapping_neg();
        }
        self.total += 1;
        Ok(())
    }

    #[inline]
    pub(crate) fn cumulative_count_unchecked(&self, symbol: usize) -> u32 {
        let mut count = 0;
        let mut i = symbol;
        while i != 0 {
            count += self.tree[i];
            i &= i - 1;
        }
        count
    }
}
