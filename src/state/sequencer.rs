use crate::types::SeatId;
use rand::seq::SliceRandom;
use rand::Rng;

/// Ordered rotation of alive seats for the description phase.
///
/// The order is fixed for one cycle; `advance` walks it one seat at a time
/// and returns `None` once every seat has had its turn.
#[derive(Debug, Clone, Default)]
pub struct TurnSequencer {
    order: Vec<SeatId>,
    index: usize,
}

impl TurnSequencer {
    /// Fresh random order over exactly the given seats
    pub fn shuffled<R: Rng + ?Sized>(seats: impl IntoIterator<Item = SeatId>, rng: &mut R) -> Self {
        let mut order: Vec<SeatId> = seats.into_iter().collect();
        order.sort();
        order.dedup();
        order.shuffle(rng);
        Self { order, index: 0 }
    }

    pub fn order(&self) -> &[SeatId] {
        &self.order
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&SeatId> {
        self.order.get(self.index)
    }

    pub fn peek_next(&self) -> Option<&SeatId> {
        self.order.get(self.index + 1)
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.order.len()
    }

    /// Move to the next seat; `None` means the rotation is complete
    pub fn advance(&mut self) -> Option<&SeatId> {
        if self.index < self.order.len() {
            self.index += 1;
        }
        self.current()
    }
}
