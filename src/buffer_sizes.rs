use smallvec::SmallVec;

use crate::layout::{BindGroupLayout, PipelineLayout};
use crate::metadata::{BindingInfoMap, EntryPointMetadata};

/// Per bind group, the minimum sizes of the buffers the layout leaves unverified, in binding index
/// order. These are checked against the bound buffers at draw or dispatch time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredBufferSizes {
    groups: SmallVec<[Vec<u64>; 4]>,
}

impl RequiredBufferSizes {
    pub(crate) fn compute(metadata: &EntryPointMetadata, layout: &PipelineLayout) -> Self {
        let empty = BindingInfoMap::new();
        let groups = layout
            .bind_group_layouts()
            .iter()
            .enumerate()
            .map(|(group, bind_group_layout)| {
                let bindings = metadata.group(group as u32).unwrap_or(&empty);
                bind_group_min_buffer_sizes(bindings, bind_group_layout)
            })
            .collect();
        Self { groups }
    }

    /// Sizes for bind group `group`, or `None` if the layout has no such group.
    pub fn group(&self, group: u32) -> Option<&[u64]> {
        self.groups.get(group as usize).map(|sizes| &sizes[..])
    }

    /// Number of bind groups in the layout the sizes were computed for.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u64]> {
        self.groups.iter().map(|sizes| &sizes[..])
    }
}

fn bind_group_min_buffer_sizes(bindings: &BindingInfoMap, layout: &BindGroupLayout) -> Vec<u64> {
    let mut sizes = Vec::with_capacity(layout.unverified_buffer_count());

    for entry in &layout.entries()[..layout.buffer_count()] {
        if entry.min_buffer_binding_size != 0 {
            continue;
        }
        // A layout buffer the shader doesn't use needs no check.
        let size = bindings
            .get(&entry.binding)
            .map_or(0, |info| info.min_buffer_binding_size());
        sizes.push(size);
    }

    debug_assert_eq!(sizes.len(), layout.unverified_buffer_count());
    sizes
}
