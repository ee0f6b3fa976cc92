//! The closed set of entity variants accepted by the indexers.

use std::fmt;
use std::sync::Arc;

use crate::course::CourseDocumentSource;
use crate::dto::{LearningMaterialDto, MeshDescriptorDto};

/// An entity handed to an indexer.
///
/// Each indexer accepts exactly one variant and rejects the others before
/// touching the network.
#[derive(Debug, Clone)]
pub enum IndexableEntity {
    LearningMaterial(LearningMaterialDto),
    Course(Arc<dyn CourseDocumentSource>),
    MeshDescriptor(MeshDescriptorDto),
}

impl IndexableEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::LearningMaterial(_) => EntityKind::LearningMaterial,
            Self::Course(_) => EntityKind::Course,
            Self::MeshDescriptor(_) => EntityKind::MeshDescriptor,
        }
    }
}

impl From<LearningMaterialDto> for IndexableEntity {
    fn from(dto: LearningMaterialDto) -> Self {
        Self::LearningMaterial(dto)
    }
}

impl From<MeshDescriptorDto> for IndexableEntity {
    fn from(dto: MeshDescriptorDto) -> Self {
        Self::MeshDescriptor(dto)
    }
}

/// Discriminant of [`IndexableEntity`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    LearningMaterial,
    Course,
    MeshDescriptor,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LearningMaterial => "learning material",
            Self::Course => "indexable course",
            Self::MeshDescriptor => "mesh descriptor",
        };
        f.write_str(name)
    }
}
