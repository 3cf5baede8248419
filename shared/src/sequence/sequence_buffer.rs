use std::collections::VecDeque;

use crate::{sequence::SequenceError, types::Seqno};

/// Items kept in ascending seqno order. Out-of-order arrivals are usually
/// close to the newest one, so inserts scan from the back.
pub struct SequenceBuffer<T> {
    list: VecDeque<(Seqno, T)>,
}

impl<T> SequenceBuffer<T> {
    pub fn new() -> Self {
        Self {
            list: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn front(&self) -> Option<&(Seqno, T)> {
        self.list.front()
    }

    pub fn pop_front(&mut self) -> Option<(Seqno, T)> {
        self.list.pop_front()
    }

    pub fn contains_scan_from_back(&self, seqno: Seqno) -> bool {
        for (old_seqno, _) in self.list.iter().rev() {
            if *old_seqno == seqno {
                return true;
            }
            if *old_seqno < seqno {
                return false;
            }
        }
        false
    }

    /// Inserts an item, keeping ascending order.
    /// Returns an error if the seqno is already buffered.
    pub fn try_insert_scan_from_back(&mut self, seqno: Seqno, item: T) -> Result<(), SequenceError> {
        let mut index = self.list.len();

        loop {
            if index == 0 {
                // made it all the way through, insert at front and be done
                self.list.push_front((seqno, item));
                return Ok(());
            }

            index -= 1;

            let old_seqno = self.list[index].0;
            if old_seqno == seqno {
                return Err(SequenceError::DuplicateSeqno { seqno });
            }
            if old_seqno < seqno {
                self.list.insert(index + 1, (seqno, item));
                return Ok(());
            }
        }
    }

    /// Removes and returns every item with a seqno up to `through`, in order
    pub fn drain_through(&mut self, through: Seqno) -> Vec<(Seqno, T)> {
        let mut output = Vec::new();
        while let Some((seqno, _)) = self.list.front() {
            if *seqno > through {
                break;
            }
            if let Some(entry) = self.list.pop_front() {
                output.push(entry);
            }
        }
        output
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn seqnos(&self) -> impl Iterator<Item = Seqno> + '_ {
        self.list.iter().map(|(seqno, _)| *seqno)
    }
}

impl<T> Default for SequenceBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
