use crate::errors::*;
use indexmap::IndexSet;
use snafu::OptionExt;
use std::collections::hash_map::{Entry, HashMap};

/// Link handle allocation. Handles are handed out in increasing order until `handle_max`, after
/// which previously freed handles are reused.
pub(crate) struct LinkSlots<T> {
    slots: HashMap<u32, T>,
    freed_handles: IndexSet<u32>,
    next_handle: u32,
    handle_max: u32,
}

impl<T> LinkSlots<T> {
    pub(crate) fn new(handle_max: u32) -> LinkSlots<T> {
        LinkSlots {
            slots: HashMap::new(),
            freed_handles: IndexSet::new(),
            next_handle: 0,
            handle_max,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&u32, &T)> {
        self.slots.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&u32, &mut T)> {
        self.slots.iter_mut()
    }

    pub(crate) fn get(&self, handle: u32) -> Option<&T> {
        self.slots.get(&handle)
    }

    pub(crate) fn get_mut(&mut self, handle: u32) -> Option<&mut T> {
        self.slots.get_mut(&handle)
    }

    pub(crate) fn insert<F>(&mut self, make_entry: F) -> Result<u32>
    where
        F: FnOnce(u32) -> T,
    {
        while self.next_handle <= self.handle_max {
            let handle = self.next_handle;
            self.next_handle = self.next_handle.saturating_add(1);
            if let Entry::Vacant(entry) = self.slots.entry(handle) {
                self.freed_handles.remove(&handle);
                entry.insert(make_entry(handle));
                return Ok(handle);
            }
            if handle == u32::max_value() {
                break;
            }
        }

        // Out of never-used handles; fall back to one that has been freed.
        let handle = self.freed_handles.pop().context(ExhaustedLinkHandlesSnafu)?;
        match self.slots.entry(handle) {
            Entry::Occupied(_) => unreachable!("freed link handle cannot be occupied"),
            Entry::Vacant(entry) => {
                entry.insert(make_entry(handle));
                Ok(handle)
            }
        }
    }

    pub(crate) fn remove(&mut self, handle: u32) -> Option<T> {
        let entry = self.slots.remove(&handle)?;
        self.freed_handles.insert(handle);
        Some(entry)
    }
}
