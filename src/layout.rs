use std::collections::BTreeMap;
use std::sync::Arc;

use wgpu::{ShaderStages, TextureFormat, TextureViewDimension};

use crate::bitset::Bitset;
use crate::config::Limits;
use crate::metadata::BindingType;
use crate::{FormatType, LayoutError};

/// One binding of a bind group layout, with the attributes it fixes ahead of time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStages,
    pub ty: BindingType,
    /// Zero when the size is left to be checked at draw or dispatch time.
    pub min_buffer_binding_size: u64,
    pub view_dimension: TextureViewDimension,
    pub texture_component_type: FormatType,
    pub storage_texture_format: Option<TextureFormat>,
    pub multisampled: bool,
}

impl BindGroupLayoutEntry {
    pub fn new(binding: u32, visibility: ShaderStages, ty: BindingType) -> Self {
        Self {
            binding,
            visibility,
            ty,
            min_buffer_binding_size: 0,
            view_dimension: TextureViewDimension::D2,
            texture_component_type: FormatType::Float,
            storage_texture_format: None,
            multisampled: false,
        }
    }

    pub fn uniform_buffer(binding: u32, visibility: ShaderStages) -> Self {
        Self::new(binding, visibility, BindingType::UniformBuffer)
    }

    pub fn storage_buffer(binding: u32, visibility: ShaderStages) -> Self {
        Self::new(binding, visibility, BindingType::StorageBuffer)
    }

    pub fn readonly_storage_buffer(binding: u32, visibility: ShaderStages) -> Self {
        Self::new(binding, visibility, BindingType::ReadonlyStorageBuffer)
    }

    pub fn sampler(binding: u32, visibility: ShaderStages) -> Self {
        Self::new(binding, visibility, BindingType::Sampler)
    }

    pub fn comparison_sampler(binding: u32, visibility: ShaderStages) -> Self {
        Self::new(binding, visibility, BindingType::ComparisonSampler)
    }

    pub fn sampled_texture(binding: u32, visibility: ShaderStages) -> Self {
        Self::new(binding, visibility, BindingType::SampledTexture)
    }

    /// A storage texture entry. `ty` should be one of the storage texture kinds.
    pub fn storage_texture(
        binding: u32,
        visibility: ShaderStages,
        ty: BindingType,
        format: TextureFormat,
    ) -> Self {
        Self {
            storage_texture_format: Some(format),
            ..Self::new(binding, visibility, ty)
        }
    }

    pub fn min_binding_size(mut self, size: u64) -> Self {
        self.min_buffer_binding_size = size;
        self
    }

    pub fn view_dimension(mut self, dimension: TextureViewDimension) -> Self {
        self.view_dimension = dimension;
        self
    }

    pub fn component_type(mut self, ty: FormatType) -> Self {
        self.texture_component_type = ty;
        self
    }

    pub fn multisampled(mut self) -> Self {
        self.multisampled = true;
        self
    }
}

/// A bind group layout with its entries packed into binding indices: buffers first, then
/// everything else, each part in ascending binding number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindGroupLayout {
    entries: Vec<BindGroupLayoutEntry>,
    binding_map: BTreeMap<u32, usize>,
    buffer_count: usize,
    unverified_buffer_count: usize,
}

impl BindGroupLayout {
    pub fn new(
        entries: impl IntoIterator<Item = BindGroupLayoutEntry>,
    ) -> Result<Self, LayoutError> {
        let mut by_binding = BTreeMap::new();
        for entry in entries {
            if by_binding.insert(entry.binding, entry).is_some() {
                return Err(LayoutError::DuplicateBinding(entry.binding));
            }
        }

        let (mut entries, others): (Vec<_>, Vec<_>) =
            by_binding.into_values().partition(|entry| entry.ty.is_buffer());
        let buffer_count = entries.len();
        let unverified_buffer_count = entries
            .iter()
            .filter(|entry| entry.min_buffer_binding_size == 0)
            .count();
        entries.extend(others);

        let binding_map = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.binding, index))
            .collect();

        Ok(Self {
            entries,
            binding_map,
            buffer_count,
            unverified_buffer_count,
        })
    }

    /// Binding number -> binding index.
    pub fn binding_map(&self) -> &BTreeMap<u32, usize> {
        &self.binding_map
    }

    pub fn binding_index(&self, binding: u32) -> Option<usize> {
        self.binding_map.get(&binding).copied()
    }

    /// The entry at binding index `index`.
    pub fn entry(&self, index: usize) -> &BindGroupLayoutEntry {
        &self.entries[index]
    }

    /// Entries in binding index order.
    pub fn entries(&self) -> &[BindGroupLayoutEntry] {
        &self.entries
    }

    /// Buffers occupy binding indices `0..buffer_count()`.
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Buffers whose size isn't fixed by the layout and must be checked at draw or dispatch time.
    pub fn unverified_buffer_count(&self) -> usize {
        self.unverified_buffer_count
    }
}

/// An ordered set of bind group layouts, one per group index starting at zero.
#[derive(Clone, Debug)]
pub struct PipelineLayout {
    groups: Vec<Arc<BindGroupLayout>>,
    mask: Bitset,
}

impl PipelineLayout {
    pub fn new(
        bind_group_layouts: impl IntoIterator<Item = Arc<BindGroupLayout>>,
        limits: &Limits,
    ) -> Result<Self, LayoutError> {
        let groups: Vec<_> = bind_group_layouts.into_iter().collect();
        if groups.len() > limits.max_bind_groups as usize {
            return Err(LayoutError::TooManyBindGroups {
                count: groups.len(),
                limit: limits.max_bind_groups,
            });
        }

        let mask = Bitset::with_prefix(limits.max_bind_groups as usize, groups.len());
        Ok(Self { groups, mask })
    }

    /// Which group indices have a layout.
    pub fn bind_group_layouts_mask(&self) -> &Bitset {
        &self.mask
    }

    pub fn bind_group_layout(&self, group: u32) -> Option<&BindGroupLayout> {
        self.groups.get(group as usize).map(|layout| &**layout)
    }

    pub fn bind_group_layouts(&self) -> &[Arc<BindGroupLayout>] {
        &self.groups
    }
}
