pub mod question_dto;
pub mod result_dto;
pub mod test_config_dto;
pub mod test_dto;
