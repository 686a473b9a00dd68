use std::ops::Deref;

use log::warn;

use replink_serde::{BitReader, BitWriter, Serde, SerdeErr};

use crate::{dirty::DirtySender, types::Reliability};

/// Object-safe view of a DataSet, used by chunk marshaling code that walks
/// fields in declaration (ordinal) order
pub trait AnyDataSet: Send {
    /// Delivery class, fixed at declaration time
    fn reliability(&self) -> Reliability;

    /// Bind the field to its ordinal and the owning chunk's dirty channel.
    /// Called once when the chunk is attached to a replica.
    fn bind(&mut self, ordinal: u8, sender: DirtySender);

    /// Serialize the current value
    fn ser_value(&self, writer: &mut BitWriter);

    /// Deserialize and apply an incoming value, firing the registered
    /// change notification on success
    fn de_apply(&mut self, reader: &mut BitReader) -> Result<(), SerdeErr>;

    /// Decode a value without applying it, for all-or-nothing buffer
    /// validation
    fn de_discard(&self, reader: &mut BitReader) -> Result<(), SerdeErr>;
}

/// A single replicated field with peer-relative dirty tracking.
///
/// `set` marks the field dirty for every currently subscribed peer; which
/// peers those are is resolved by the owning chunk's [`DirtyChannel`]
/// (dirtiness is per peer, not a single global bit).
///
/// [`DirtyChannel`]: crate::dirty::DirtyChannel
pub struct DataSet<T: Serde + Send> {
    value: T,
    reliability: Reliability,
    ordinal: Option<u8>,
    sender: Option<DirtySender>,
    on_change: Option<Box<dyn FnMut(&T) + Send>>,
}

impl<T: Serde + Send> DataSet<T> {
    pub fn new(value: T, reliability: Reliability) -> Self {
        Self {
            value,
            reliability,
            ordinal: None,
            sender: None,
            on_change: None,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Update the stored value and mark it dirty for every subscribed peer.
    /// Repeated sets between ticks coalesce: only the last value is
    /// marshaled.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.mark_dirty();
    }

    /// Register a callback fired when an incoming value is applied on a
    /// proxy
    pub fn on_change(&mut self, callback: impl FnMut(&T) + Send + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    fn mark_dirty(&self) {
        match (&self.sender, self.ordinal) {
            (Some(sender), Some(ordinal)) => {
                let _marked = sender.mark(ordinal);
            }
            _ => {
                // set before the chunk was attached to a replica; the value
                // still ships with the initial full-state send
                warn!("DataSet set before binding; no peers marked dirty");
            }
        }
    }
}

impl<T: Serde + Send> AnyDataSet for DataSet<T> {
    fn reliability(&self) -> Reliability {
        self.reliability
    }

    fn bind(&mut self, ordinal: u8, sender: DirtySender) {
        self.ordinal = Some(ordinal);
        self.sender = Some(sender);
    }

    fn ser_value(&self, writer: &mut BitWriter) {
        self.value.ser(writer);
    }

    fn de_apply(&mut self, reader: &mut BitReader) -> Result<(), SerdeErr> {
        self.value = T::de(reader)?;
        if let Some(callback) = &mut self.on_change {
            callback(&self.value);
        }
        Ok(())
    }

    fn de_discard(&self, reader: &mut BitReader) -> Result<(), SerdeErr> {
        T::de(reader).map(|_| ())
    }
}

// Read access coerces to the inner value; writes must go through `set` so
// dirty bits are maintained
impl<T: Serde + Send> Deref for DataSet<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;
    use crate::{dirty::DirtyChannel, types::PeerId};

    #[test]
    fn set_marks_dirty_for_subscribed_peers() {
        let channel = DirtyChannel::new(2);
        channel.add_peer(PeerId(1)).unwrap();

        let mut field = DataSet::new(0u16, Reliability::Reliable);
        field.bind(1, channel.sender());
        field.set(42);

        assert_eq!(*field.get(), 42);
        let mask = channel.dirty_mask(PeerId(1)).unwrap();
        assert!(mask.bit(1));
        assert!(!mask.bit(0));
    }

    #[test]
    fn set_before_bind_keeps_value() {
        let mut field = DataSet::new(0u16, Reliability::Unreliable);
        field.set(7);
        assert_eq!(*field, 7);
    }

    #[test]
    fn de_apply_fires_change_notification() {
        let mut source = DataSet::new(99u16, Reliability::Reliable);
        let mut writer = BitWriter::new();
        source.ser_value(&mut writer);
        let bytes = writer.to_bytes();

        let observed = Arc::new(AtomicU32::new(0));
        let observer = observed.clone();
        let mut target = DataSet::new(0u16, Reliability::Reliable);
        target.on_change(move |value| {
            observer.store(u32::from(*value), Ordering::SeqCst);
        });

        let mut reader = BitReader::new(&bytes);
        target.de_apply(&mut reader).unwrap();
        assert_eq!(*target, 99);
        assert_eq!(observed.load(Ordering::SeqCst), 99);
    }

    #[test]
    fn de_apply_truncated_fails_without_notification() {
        let observed = Arc::new(AtomicU32::new(0));
        let observer = observed.clone();
        let mut target = DataSet::new(5u16, Reliability::Reliable);
        target.on_change(move |_| {
            observer.fetch_add(1, Ordering::SeqCst);
        });

        let mut reader = BitReader::new(&[0xFF]);
        assert!(target.de_apply(&mut reader).is_err());
        assert_eq!(*target, 5);
        assert_eq!(observed.load(Ordering::SeqCst), 0);
    }
}
