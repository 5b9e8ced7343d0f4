//! 配置校验模块
//!
//! 校验规则：
//! - processor name 非空且唯一
//! - `*` 为保留名 (additional content 通配符)
//! - file processor 必须提供 base_path
//! - popup processor 的 max_unread 必须为正整数

use std::collections::HashSet;

use contracts::{ContractError, CourierConfig, ProcessorConfig, ProcessorType, ALL_PROCESSORS};

/// 校验 CourierConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &CourierConfig) -> Result<(), ContractError> {
    validate_processor_names(config)?;
    for (idx, processor) in config.processors.iter().enumerate() {
        validate_processor_params(idx, processor)?;
    }
    Ok(())
}

/// 校验 processor name
fn validate_processor_names(config: &CourierConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, processor) in config.processors.iter().enumerate() {
        let name = processor.name.as_str();
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("processors[{idx}].name"),
                "processor name cannot be empty",
            ));
        }
        if name == ALL_PROCESSORS {
            return Err(ContractError::config_validation(
                format!("processors[{idx}].name"),
                format!("'{ALL_PROCESSORS}' is reserved"),
            ));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ContractError::config_validation(
                format!("processors[{idx}].name"),
                format!("processor name '{name}' cannot contain whitespace"),
            ));
        }
        if !seen.insert(name) {
            return Err(ContractError::config_validation(
                format!("processors[name={name}]"),
                "duplicate processor name",
            ));
        }
    }
    Ok(())
}

/// 校验类型特定参数
fn validate_processor_params(idx: usize, processor: &ProcessorConfig) -> Result<(), ContractError> {
    match processor.processor_type {
        ProcessorType::Log => Ok(()),
        ProcessorType::File => match processor.params.get("base_path") {
            Some(path) if !path.trim().is_empty() => Ok(()),
            _ => Err(ContractError::config_validation(
                format!("processors[{idx}].params.base_path"),
                "file processor requires base_path",
            )),
        },
        ProcessorType::Popup => match processor.params.get("max_unread") {
            None => Ok(()),
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => Ok(()),
                _ => Err(ContractError::config_validation(
                    format!("processors[{idx}].params.max_unread"),
                    format!("max_unread must be a positive integer, got '{raw}'"),
                )),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigVersion, MessagingSection};
    use std::collections::HashMap;

    fn processor(name: &str, processor_type: ProcessorType) -> ProcessorConfig {
        ProcessorConfig {
            name: name.into(),
            processor_type,
            enabled: true,
            params: HashMap::new(),
        }
    }

    fn minimal_config() -> CourierConfig {
        let mut email = processor("email", ProcessorType::File);
        email.params.insert("base_path".into(), "./spool".into());
        CourierConfig {
            version: ConfigVersion::V1,
            messaging: MessagingSection { enabled: true },
            processors: vec![processor("popup", ProcessorType::Popup), email],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_duplicate_processor_name() {
        let mut config = minimal_config();
        config.processors.push(processor("popup", ProcessorType::Log));
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate processor name"), "got: {err}");
    }

    #[test]
    fn test_empty_processor_name() {
        let mut config = minimal_config();
        config.processors[0].name = String::new();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_wildcard_name_reserved() {
        let mut config = minimal_config();
        config.processors[0].name = "*".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("reserved"), "got: {err}");
    }

    #[test]
    fn test_file_processor_requires_base_path() {
        let mut config = minimal_config();
        config.processors[1].params.clear();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("base_path"), "got: {err}");
    }

    #[test]
    fn test_popup_max_unread_must_be_positive() {
        let mut config = minimal_config();
        config.processors[0]
            .params
            .insert("max_unread".into(), "0".into());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("max_unread"), "got: {err}");
    }
}
