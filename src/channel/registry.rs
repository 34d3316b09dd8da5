use alloc::collections::{btree_map::Entry, BTreeMap};

use super::Channel;
use crate::{
    error::{ChannelError, Result},
    types::ChannelId,
};

/// All channels known to the contract, keyed by id. Channels are never
/// removed, so an id can never be reused.
#[derive(Debug, Default, Clone)]
pub struct ChannelRegistry {
    channels: BTreeMap<ChannelId, Channel>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, channel: Channel) -> Result<&Channel> {
        match self.channels.entry(channel.id()) {
            Entry::Occupied(entry) => Err(ChannelError::AlreadyExists(*entry.key())),
            Entry::Vacant(entry) => Ok(entry.insert(channel)),
        }
    }

    pub fn get(&self, id: &ChannelId) -> Result<&Channel> {
        self.channels.get(id).ok_or(ChannelError::NotFound(*id))
    }

    pub fn get_mut(&mut self, id: &ChannelId) -> Result<&mut Channel> {
        self.channels.get_mut(id).ok_or(ChannelError::NotFound(*id))
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.channels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }
}
