pub mod report_dto;

pub use report_dto::{
    ListReportsQuery, PendingFactsResponseDto, ReportDetailResponseDto, ReportLinkResponseDto,
    ReportResponseDto, SetPlanDto, SetReportResourcesDto, UpdateReportDetailsDto,
    UpdateReportStatusDto,
};
