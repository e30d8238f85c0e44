pub mod resource_dto;

pub use resource_dto::{
    AddProductionDto, CreateResourceDto, ProductionResponseDto, ResourceDetailResponseDto,
    ResourceListQuery, ResourceResponseDto, UpdateResourceDto, UploadImageDto,
};
