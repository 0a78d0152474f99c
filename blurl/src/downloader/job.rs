/// Completion record of one media segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentState {
    Pending,
    Done,
    /// Last index answered 404 because the segment count was overestimated.
    ToleratedMissing,
    Failed,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    /// Number of segments that have not reported yet.
    Fetching(usize),
    Reassembling,
    Done,
    Aborted,
}

/// Per-index completion state of a segmented download.
///
/// Slots are indexed by segment number (1-based) and each one leaves
/// `Pending` exactly once. `expected` only ever shrinks, by one, through
/// [`DownloadJob::tolerate_missing`].
#[derive(Debug)]
pub struct DownloadJob {
    expected: usize,
    decremented: bool,
    slots: Vec<SegmentState>,
    state: JobState,
}

impl DownloadJob {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            decremented: false,
            slots: vec![SegmentState::Pending; expected],
            state: JobState::Pending,
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn segment(&self, index: usize) -> Option<SegmentState> {
        index.checked_sub(1).and_then(|x| self.slots.get(x)).copied()
    }

    pub fn start(&mut self) {
        if self.state == JobState::Pending {
            self.state = JobState::Fetching(self.slots.len());
        }
    }

    pub fn outstanding(&self) -> usize {
        self.slots
            .iter()
            .filter(|&&x| x == SegmentState::Pending)
            .count()
    }

    pub fn complete(&mut self, index: usize) -> bool {
        self.report(index, SegmentState::Done)
    }

    pub fn fail(&mut self, index: usize) -> bool {
        self.report(index, SegmentState::Failed)
    }

    pub fn cancel(&mut self, index: usize) -> bool {
        self.report(index, SegmentState::Cancelled)
    }

    /// Accept a 404 on `index` if it is the current last index and no
    /// segment has been tolerated yet. Returns false when the miss is fatal.
    pub fn tolerate_missing(&mut self, index: usize) -> bool {
        if self.decremented || index != self.expected {
            return false;
        }

        if self.report(index, SegmentState::ToleratedMissing) {
            self.expected -= 1;
            self.decremented = true;
            true
        } else {
            false
        }
    }

    pub fn has_failures(&self) -> bool {
        self.slots
            .iter()
            .any(|&x| matches!(x, SegmentState::Failed | SegmentState::Cancelled))
    }

    /// Indices of downloaded segments in ascending order.
    pub fn completed(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, x)| **x == SegmentState::Done)
            .map(|(i, _)| i + 1)
    }

    /// Enter reassembly. Only possible once every slot has reported and none failed.
    pub fn begin_reassembly(&mut self) -> bool {
        if self.state != JobState::Fetching(0) || self.has_failures() {
            return false;
        }

        self.state = JobState::Reassembling;
        true
    }

    pub fn finish(&mut self) {
        if self.state == JobState::Reassembling {
            self.state = JobState::Done;
        }
    }

    pub fn abort(&mut self) {
        if self.state != JobState::Done {
            self.state = JobState::Aborted;
        }
    }

    fn report(&mut self, index: usize, state: SegmentState) -> bool {
        let JobState::Fetching(outstanding) = self.state else {
            return false;
        };

        match index.checked_sub(1).and_then(|x| self.slots.get_mut(x)) {
            Some(slot) if *slot == SegmentState::Pending => {
                *slot = state;
                self.state = JobState::Fetching(outstanding - 1);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetching(expected: usize) -> DownloadJob {
        let mut job = DownloadJob::new(expected);
        job.start();
        job
    }

    #[test]
    fn tracks_outstanding_segments() {
        let mut job = fetching(3);
        assert_eq!(job.state(), JobState::Fetching(3));

        assert!(job.complete(2));
        assert!(job.complete(1));
        assert_eq!(job.state(), JobState::Fetching(1));
        assert_eq!(job.outstanding(), 1);

        assert!(job.complete(3));
        assert!(job.begin_reassembly());
        assert_eq!(job.completed().collect::<Vec<_>>(), vec![1, 2, 3]);

        job.finish();
        assert_eq!(job.state(), JobState::Done);
    }

    #[test]
    fn reports_each_index_once() {
        let mut job = fetching(2);
        assert!(job.complete(1));
        assert!(!job.complete(1));
        assert!(!job.fail(1));
        assert!(!job.complete(0));
        assert!(!job.complete(3));
        assert_eq!(job.state(), JobState::Fetching(1));
    }

    #[test]
    fn reports_are_ignored_before_start() {
        let mut job = DownloadJob::new(2);
        assert!(!job.complete(1));
        assert_eq!(job.segment(1), Some(SegmentState::Pending));
    }

    #[test]
    fn tolerates_only_the_last_index_once() {
        let mut job = fetching(5);

        assert!(!job.tolerate_missing(3));
        assert!(job.tolerate_missing(5));
        assert_eq!(job.expected(), 4);
        assert_eq!(job.segment(5), Some(SegmentState::ToleratedMissing));

        // index 4 is now the last one but the single decrement is spent
        assert!(!job.tolerate_missing(4));
        assert_eq!(job.expected(), 4);
    }

    #[test]
    fn tolerated_job_reassembles_remaining_segments() {
        let mut job = fetching(5);

        for index in [4, 2, 1, 3] {
            assert!(job.complete(index));
        }

        assert!(job.tolerate_missing(5));
        assert!(job.begin_reassembly());
        assert_eq!(job.completed().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn failures_block_reassembly() {
        let mut job = fetching(3);
        job.complete(1);
        job.fail(3);
        job.cancel(2);

        assert!(job.has_failures());
        assert!(!job.begin_reassembly());

        job.abort();
        assert_eq!(job.state(), JobState::Aborted);
    }

    #[test]
    fn barrier_does_not_release_early() {
        let mut job = fetching(2);
        job.complete(1);
        assert!(!job.begin_reassembly());
    }
}
