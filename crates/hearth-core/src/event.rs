//! Typed device events with pre-allocated ring buffers.
//!
//! Devices emit events as their state machines move (fuel ignites, a recipe
//! completes, the fire goes out). Events are buffered per kind and handed to
//! passive listeners in batch by [`EventBus::deliver`]. Listeners are
//! write-only observers: nothing they do feeds back into a device.
//!
//! Every event carries the tick it happened at and a `retroactive` flag.
//! Events produced by a calendar update describe things that "already
//! happened" while the device was unloaded; presentation code typically
//! filters those out so that, say, a completion sound is not played for a
//! recipe that finished three days ago.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::clock::Ticks;
use crate::id::*;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A device event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // -- Lifecycle --
    DevicePlaced {
        device: DeviceId,
        tick: Ticks,
    },
    DeviceRemoved {
        device: DeviceId,
        tick: Ticks,
    },
    CalendarUpdated {
        device: DeviceId,
        elapsed: Ticks,
        tick: Ticks,
    },

    // -- Fire --
    Ignited {
        device: DeviceId,
        tick: Ticks,
        retroactive: bool,
    },
    FuelConsumed {
        device: DeviceId,
        fuel: FuelId,
        tick: Ticks,
        retroactive: bool,
    },
    /// The fuel slots shifted toward the consume slot after a dequeue.
    FuelCascaded {
        device: DeviceId,
        queued: usize,
        tick: Ticks,
        retroactive: bool,
    },
    Extinguished {
        device: DeviceId,
        tick: Ticks,
        retroactive: bool,
    },

    // -- Recipes --
    RecipeStarted {
        device: DeviceId,
        recipe: RecipeId,
        tick: Ticks,
        retroactive: bool,
    },
    RecipeCompleted {
        device: DeviceId,
        recipe: RecipeId,
        tick: Ticks,
        retroactive: bool,
    },
    RecipeInvalidated {
        device: DeviceId,
        recipe: RecipeId,
        tick: Ticks,
        retroactive: bool,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DevicePlaced,
    DeviceRemoved,
    CalendarUpdated,
    Ignited,
    FuelConsumed,
    FuelCascaded,
    Extinguished,
    RecipeStarted,
    RecipeCompleted,
    RecipeInvalidated,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 10;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DevicePlaced { .. } => EventKind::DevicePlaced,
            Event::DeviceRemoved { .. } => EventKind::DeviceRemoved,
            Event::CalendarUpdated { .. } => EventKind::CalendarUpdated,
            Event::Ignited { .. } => EventKind::Ignited,
            Event::FuelConsumed { .. } => EventKind::FuelConsumed,
            Event::FuelCascaded { .. } => EventKind::FuelCascaded,
            Event::Extinguished { .. } => EventKind::Extinguished,
            Event::RecipeStarted { .. } => EventKind::RecipeStarted,
            Event::RecipeCompleted { .. } => EventKind::RecipeCompleted,
            Event::RecipeInvalidated { .. } => EventKind::RecipeInvalidated,
        }
    }

    pub fn device(&self) -> DeviceId {
        match self {
            Event::DevicePlaced { device, .. }
            | Event::DeviceRemoved { device, .. }
            | Event::CalendarUpdated { device, .. }
            | Event::Ignited { device, .. }
            | Event::FuelConsumed { device, .. }
            | Event::FuelCascaded { device, .. }
            | Event::Extinguished { device, .. }
            | Event::RecipeStarted { device, .. }
            | Event::RecipeCompleted { device, .. }
            | Event::RecipeInvalidated { device, .. } => *device,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            Event::DevicePlaced { tick, .. }
            | Event::DeviceRemoved { tick, .. }
            | Event::CalendarUpdated { tick, .. }
            | Event::Ignited { tick, .. }
            | Event::FuelConsumed { tick, .. }
            | Event::FuelCascaded { tick, .. }
            | Event::Extinguished { tick, .. }
            | Event::RecipeStarted { tick, .. }
            | Event::RecipeCompleted { tick, .. }
            | Event::RecipeInvalidated { tick, .. } => *tick,
        }
    }

    /// Whether this event was reconstructed by a calendar update.
    pub fn is_retroactive(&self) -> bool {
        match self {
            Event::DevicePlaced { .. }
            | Event::DeviceRemoved { .. }
            | Event::CalendarUpdated { .. } => false,
            Event::Ignited { retroactive, .. }
            | Event::FuelConsumed { retroactive, .. }
            | Event::FuelCascaded { retroactive, .. }
            | Event::Extinguished { retroactive, .. }
            | Event::RecipeStarted { retroactive, .. }
            | Event::RecipeCompleted { retroactive, .. }
            | Event::RecipeInvalidated { retroactive, .. } => *retroactive,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events that were dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head is the next write position, i.e. the oldest entry
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over events in an [`EventBuffer`], from oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Listeners, priorities & filters
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Priority level for listeners. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Filter that drops events reconstructed by calendar updates.
pub fn live_only() -> EventFilter {
    Box::new(|event| !event.is_retroactive())
}

struct SubscriberEntry {
    listener: PassiveListener,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("priority", &self.priority)
            .field(
                "filter",
                &if self.filter.is_some() {
                    "Some(<fn>)"
                } else {
                    "None"
                },
            )
            .field("insertion_order", &self.insertion_order)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Holds one ring buffer per event kind, listener lists, and suppression
/// flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],
    default_capacity: usize,
    /// Monotonically increasing counter for stable sort ordering.
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: Default::default(),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Suppress an event kind. Suppressed events are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Emit an event. Stores it in the appropriate ring buffer. No-ops if
    /// the event kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a listener for an event kind with Normal priority and no
    /// filter.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    /// Register a listener with explicit priority and optional filter.
    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.subscribers[kind.index()].push(SubscriberEntry {
            listener,
            priority,
            filter,
            insertion_order: order,
        });
    }

    /// Deliver all buffered events to listeners, then clear the buffers.
    ///
    /// Kinds are visited in declaration order. Within a kind, listeners run
    /// by `(priority, registration order)` and each sees the events oldest
    /// first.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] {
                continue;
            }
            let Some(buffer) = self.buffers[idx].as_ref() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }

            // Copy out to avoid borrowing the buffer and listeners together.
            let events: Vec<Event> = buffer.iter().cloned().collect();

            self.subscribers[idx]
                .sort_by_key(|entry| (entry.priority as u8, entry.insertion_order));

            for entry in &mut self.subscribers[idx] {
                for event in &events {
                    if let Some(filter) = &entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }

            if let Some(buffer) = self.buffers[idx].as_mut() {
                buffer.clear();
            }
        }
    }

    /// Get the event buffer for a specific event kind (read-only).
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Buffered events of one kind, oldest first.
    pub fn events(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.buffers[kind.index()].iter().flat_map(|b| b.iter())
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    /// Clear all buffers. Does not remove listeners or suppression settings.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
