//! An intrusive doubly-linked FIFO whose nodes live in a slot arena.
//!
//! Links are slot indices instead of pointers. Freed slots are threaded onto a
//! free list and reused, so steady-state enqueue/dequeue traffic stops
//! allocating nodes once the arena has grown to the queue's high-water mark.
//! Discarding everything is a walk over the chain followed by releasing the
//! arena, so a drained list holds no node memory from its high-water mark.
//!
//! `NodeList` is not synchronized. `PendingQueue` keeps it behind its mutex and
//! the count and byte total kept here are the authoritative ones.

use crate::buffer::Buffer;
use crate::error::QueueError;
use std::mem;

type SlotId = usize;

struct Node {
    buffer: Buffer,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

enum Slot {
    Occupied(Node),
    /// Link to the next free slot.
    Vacant(Option<SlotId>),
}

#[derive(Default)]
pub(crate) struct NodeList {
    slots: Vec<Slot>,
    free: Option<SlotId>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    count: usize,
    total_bytes: usize,
}

impl NodeList {
    pub fn new() -> Self {
        NodeList::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Appends `buffer` at the tail.
    ///
    /// If the arena has no vacant slot and no spare capacity it grows first.
    /// When growing fails the buffer is dropped and the list is untouched.
    pub fn push_back(&mut self, buffer: Buffer) -> Result<(), QueueError> {
        if self.free.is_none() && self.slots.len() == self.slots.capacity() {
            self.slots.try_reserve(1)?;
        }

        let size = buffer.len();
        let node = Node {
            buffer,
            prev: self.tail,
            next: None,
        };
        let id = match self.free {
            Some(id) => {
                self.free = match mem::replace(&mut self.slots[id], Slot::Occupied(node)) {
                    Slot::Vacant(next_free) => next_free,
                    Slot::Occupied(_) => unreachable!("free list points at an occupied slot"),
                };
                id
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.count += 1;
        self.total_bytes += size;
        Ok(())
    }

    /// Detaches the head node and returns its buffer.
    pub fn pop_front(&mut self) -> Option<Buffer> {
        let id = self.head?;
        let node = match mem::replace(&mut self.slots[id], Slot::Vacant(self.free)) {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => unreachable!("head points at a vacant slot"),
        };
        self.free = Some(id);

        self.head = node.next;
        match self.head {
            Some(new_head) => self.node_mut(new_head).prev = None,
            None => self.tail = None,
        }
        self.count -= 1;
        self.total_bytes -= node.buffer.len();
        Some(node.buffer)
    }

    pub fn front(&self) -> Option<&Buffer> {
        self.head.map(|id| &self.node(id).buffer)
    }

    /// Releases every buffer from head to tail, then the arena itself, and
    /// resets the list. Returns the number of packets and bytes that were
    /// discarded.
    pub fn clear(&mut self) -> (usize, usize) {
        let discarded = (self.count, self.total_bytes);

        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = match mem::replace(&mut self.slots[id], Slot::Vacant(None)) {
                Slot::Occupied(node) => node,
                Slot::Vacant(_) => unreachable!("chain points at a vacant slot"),
            };
            cursor = node.next;
            drop(node.buffer);
        }

        self.slots = Vec::new();
        self.free = None;
        self.head = None;
        self.tail = None;
        self.count = 0;
        self.total_bytes = 0;
        discarded
    }

    /// Buffers from oldest to newest.
    #[cfg(test)]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Walks the chain in both directions and checks it against the counters.
    pub fn check(&self) -> Result<(), String> {
        if (self.count == 0) != (self.head.is_none() && self.tail.is_none()) {
            return Err(format!(
                "count {} disagrees with head {:?} / tail {:?}",
                self.count, self.head, self.tail
            ));
        }

        let mut forward = Vec::with_capacity(self.count);
        let mut bytes = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            if forward.len() > self.count {
                return Err(format!("chain is longer than count {}", self.count));
            }
            let node = match self.slots.get(id) {
                Some(Slot::Occupied(node)) => node,
                _ => return Err(format!("slot {} is linked but not occupied", id)),
            };
            if node.prev != prev {
                return Err(format!(
                    "slot {} has prev {:?}, expected {:?}",
                    id, node.prev, prev
                ));
            }
            bytes += node.buffer.len();
            forward.push(id);
            prev = Some(id);
            cursor = node.next;
        }
        if prev != self.tail {
            return Err(format!(
                "forward walk ended at {:?}, tail is {:?}",
                prev, self.tail
            ));
        }
        if forward.len() != self.count {
            return Err(format!(
                "chain has {} nodes, count is {}",
                forward.len(),
                self.count
            ));
        }
        if bytes != self.total_bytes {
            return Err(format!(
                "chain holds {} bytes, total is {}",
                bytes, self.total_bytes
            ));
        }

        let mut backward = Vec::with_capacity(self.count);
        let mut cursor = self.tail;
        while let Some(id) = cursor {
            if backward.len() > self.count {
                return Err(format!("reverse chain is longer than count {}", self.count));
            }
            backward.push(id);
            cursor = self.node(id).prev;
        }
        backward.reverse();
        if backward != forward {
            return Err("reverse walk does not mirror forward walk".to_string());
        }
        Ok(())
    }

    fn node(&self, id: SlotId) -> &Node {
        match &self.slots[id] {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => unreachable!("slot {} is vacant", id),
        }
    }

    fn node_mut(&mut self, id: SlotId) -> &mut Node {
        match &mut self.slots[id] {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => unreachable!("slot {} is vacant", id),
        }
    }
}

#[cfg(test)]
pub(crate) struct Iter<'a> {
    list: &'a NodeList,
    cursor: Option<SlotId>,
}

#[cfg(test)]
impl<'a> Iterator for Iter<'a> {
    type Item = &'a Buffer;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?);
        self.cursor = node.next;
        Some(&node.buffer)
    }
}
