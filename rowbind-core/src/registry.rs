use crate::{
    RawStatement, Received, ResultSlot, SlotKind, SlotRef,
    marshal::{Marshaled, marshal_row},
};

/// Ordered result slots of the active statement.
///
/// Clearing registered slots starts a new generation so that handles from an earlier registration stop resolving.
#[derive(Debug, Default)]
pub(crate) struct SlotRegistry {
    slots: Vec<ResultSlot>,
    generation: u64,
}

impl SlotRegistry {
    pub(crate) fn push<S: SlotKind>(&mut self, slot: S) -> SlotRef<S> {
        let index = self.slots.len();
        self.slots.push(slot.into());
        SlotRef::new(index, self.generation)
    }

    pub(crate) fn clear(&mut self) {
        if self.slots.is_empty() {
            return;
        }
        self.slots.clear();
        self.generation += 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn get<S: SlotKind>(&self, slot: &SlotRef<S>) -> Option<&S> {
        self.resolve(slot).and_then(S::from_slot)
    }

    pub(crate) fn received<S>(&self, slot: &SlotRef<S>) -> Option<Received> {
        self.resolve(slot).map(ResultSlot::received)
    }

    pub(crate) fn marshal<S: RawStatement + ?Sized>(&mut self, statement: &mut S) -> Marshaled {
        marshal_row(&mut self.slots, statement)
    }

    fn resolve<S>(&self, slot: &SlotRef<S>) -> Option<&ResultSlot> {
        if slot.generation != self.generation {
            return None;
        }
        self.slots.get(slot.index)
    }
}
