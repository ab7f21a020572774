use crate::dataloader::error::{DataError, Result};

// Always works in byte counts

#[derive(Debug)]
pub struct MemoryTracker {
    maximum: u64,
    current: u64,
    peak: u64,
    allocations: u64,
}

impl MemoryTracker {
    pub fn new(maximum: u64) -> Self {
        Self {
            maximum,
            current: 0,
            peak: 0,
            allocations: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    pub fn allocate(&mut self, size: u64) -> Result<()> {
        let new_usage = match self.current.checked_add(size) {
            Some(usage) => usage,
            None => {
                return Err(DataError::OutOfMemory(format!(
                    "Memory allocation would overflow: current {} + size {}",
                    self.current, size
                )))
            }
        };
        if new_usage > self.maximum {
            return Err(DataError::OutOfMemory(format!(
                "Memory limit exceeded: tried to allocate {} bytes when {} of {} bytes are used",
                size, self.current, self.maximum
            )));
        }
        self.current = new_usage;
        self.peak = self.peak.max(new_usage);
        self.allocations += 1;
        Ok(())
    }

    pub fn deallocate(&mut self, size: u64) {
        self.current = self.current.saturating_sub(size);
    }

    pub fn get_current(&self) -> u64 {
        self.current
    }

    pub fn get_maximum(&self) -> u64 {
        self.maximum
    }

    pub fn get_available(&self) -> u64 {
        self.maximum - self.current
    }

    pub fn get_peak(&self) -> u64 {
        self.peak
    }

    /// Number of successful allocations since creation.
    pub fn get_allocations(&self) -> u64 {
        self.allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_usage_and_peak() {
        let mut tracker = MemoryTracker::new(100);
        tracker.allocate(60).unwrap();
        tracker.deallocate(60);
        tracker.allocate(40).unwrap();
        assert_eq!(tracker.get_current(), 40);
        assert_eq!(tracker.get_peak(), 60);
        assert_eq!(tracker.get_available(), 60);
        assert_eq!(tracker.get_allocations(), 2);
    }

    #[test]
    fn rejects_over_budget_and_overflow() {
        let mut tracker = MemoryTracker::new(100);
        tracker.allocate(80).unwrap();
        assert!(matches!(tracker.allocate(21), Err(DataError::OutOfMemory(_))));
        assert_eq!(tracker.get_current(), 80);

        let mut tracker = MemoryTracker::unlimited();
        tracker.allocate(u64::MAX).unwrap();
        assert!(matches!(tracker.allocate(1), Err(DataError::OutOfMemory(_))));
    }

    #[test]
    fn deallocate_saturates() {
        let mut tracker = MemoryTracker::new(10);
        tracker.deallocate(5);
        assert_eq!(tracker.get_current(), 0);
    }
}
