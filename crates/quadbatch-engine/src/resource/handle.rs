use generational_arena::{Arena, Index};

use crate::error::{ResourceError, ResourceKind};

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(Index);

        impl $name {
            #[inline]
            pub(crate) fn from_index(index: Index) -> Self {
                Self(index)
            }

            #[inline]
            pub(crate) fn index(self) -> Index {
                self.0
            }
        }
    };
}

resource_id!(
    /// Handle to a pipeline (vertex shader + fragment shader + blend state).
    PipelineId
);
resource_id!(
    /// Handle to a compiled shader stage.
    ShaderId
);
resource_id!(
    /// Handle to a sampled texture or a render target.
    TextureId
);

/// Generation-checked storage for one kind of device object.
///
/// A slot reused after `remove` gets a new generation, so a handle to the old
/// object is reported as stale instead of aliasing the new one.
#[derive(Debug)]
pub struct ResourceTable<T> {
    kind: ResourceKind,
    slots: Arena<T>,
}

impl<T> ResourceTable<T> {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            slots: Arena::new(),
        }
    }

    #[inline]
    pub fn insert(&mut self, value: T) -> Index {
        self.slots.insert(value)
    }

    pub fn get(&self, index: Index) -> Result<&T, ResourceError> {
        self.slots
            .get(index)
            .ok_or(ResourceError::stale(self.kind))
    }

    pub fn get_mut(&mut self, index: Index) -> Result<&mut T, ResourceError> {
        let kind = self.kind;
        self.slots
            .get_mut(index)
            .ok_or(ResourceError::stale(kind))
    }

    pub fn remove(&mut self, index: Index) -> Result<T, ResourceError> {
        self.slots
            .remove(index)
            .ok_or(ResourceError::stale(self.kind))
    }

    #[inline]
    pub fn contains(&self, index: Index) -> bool {
        self.slots.contains(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Count of caller-owned objects still alive on a device.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct LiveResources {
    pub pipelines: usize,
    pub shaders: usize,
    pub textures: usize,
}

impl LiveResources {
    #[inline]
    pub fn total(&self) -> usize {
        self.pipelines + self.shaders + self.textures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handle_is_stale() {
        let mut table = ResourceTable::new(ResourceKind::Texture);
        let a = table.insert("a");
        assert_eq!(table.remove(a), Ok("a"));
        assert_eq!(
            table.get(a),
            Err(ResourceError::Stale { kind: ResourceKind::Texture })
        );
        assert!(table.remove(a).is_err());
    }

    #[test]
    fn reused_slot_does_not_alias() {
        let mut table = ResourceTable::new(ResourceKind::Shader);
        let a = table.insert(1);
        table.remove(a).unwrap();
        let b = table.insert(2);
        assert_ne!(a, b);
        assert!(table.get(a).is_err());
        assert_eq!(table.get(b), Ok(&2));
    }

    #[test]
    fn live_total_sums_kinds() {
        let live = LiveResources { pipelines: 1, shaders: 2, textures: 3 };
        assert_eq!(live.total(), 6);
    }
}
