//! Balancer Vault revert 解码器
//!
//! Vault 使用 `BAL#xxx` 形式的 Error(string)，这里把它翻译成可读的错误名

use ethers::abi::{self, Token};
use ethers::types::U256;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

const SELECTOR_ERROR_STRING: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
const SELECTOR_PANIC: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

lazy_static::lazy_static! {
    static ref BAL_CODE_PATTERN: Regex = Regex::new(r"BAL#([0-9]{3})").unwrap();

    static ref HEX_PATTERNS: Vec<Regex> = [
        // Revert(Bytes(0x...))
        r"Bytes\((0x[0-9a-fA-F]+)\)",
        // revert data: 0x...
        r"revert data[: \t]+(0x[0-9a-fA-F]+)",
        // execution reverted: 0x...
        r"reverted[: \t]+(0x[0-9a-fA-F]+)",
        r"(0x08c379a0[0-9a-fA-F]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    // Balancer V2 错误码 (仅收录兑换路径上常见的部分)
    static ref BALANCER_ERRORS: HashMap<u16, &'static str> = {
        let mut m = HashMap::new();
        m.insert(0, "ADD_OVERFLOW");
        m.insert(1, "SUB_OVERFLOW");
        m.insert(2, "SUB_UNDERFLOW");
        m.insert(3, "MUL_OVERFLOW");
        m.insert(4, "ZERO_DIVISION");
        m.insert(100, "OUT_OF_BOUNDS");
        m.insert(101, "UNSORTED_ARRAY");
        m.insert(103, "INPUT_LENGTH_MISMATCH");
        m.insert(104, "ZERO_TOKEN");
        m.insert(304, "MAX_IN_RATIO");
        m.insert(305, "MAX_OUT_RATIO");
        m.insert(400, "REENTRANCY");
        m.insert(401, "SENDER_NOT_ALLOWED");
        m.insert(402, "PAUSED");
        m.insert(406, "INSUFFICIENT_BALANCE");
        m.insert(407, "INSUFFICIENT_ALLOWANCE");
        m.insert(500, "INVALID_POOL_ID");
        m.insert(501, "CALLER_NOT_POOL");
        m.insert(502, "SENDER_NOT_ASSET_MANAGER");
        m.insert(503, "USER_DOESNT_ALLOW_RELAYER");
        m.insert(504, "INVALID_SIGNATURE");
        m.insert(505, "EXIT_BELOW_MIN");
        m.insert(506, "JOIN_ABOVE_MAX");
        m.insert(507, "SWAP_LIMIT");
        m.insert(508, "SWAP_DEADLINE");
        m.insert(509, "CANNOT_SWAP_SAME_TOKEN");
        m.insert(510, "UNKNOWN_AMOUNT_IN_FIRST_SWAP");
        m.insert(511, "MALCONSTRUCTED_MULTIHOP_SWAP");
        m.insert(512, "INTERNAL_BALANCE_OVERFLOW");
        m.insert(513, "INSUFFICIENT_INTERNAL_BALANCE");
        m.insert(514, "INVALID_ETH_INTERNAL_BALANCE");
        m.insert(515, "INVALID_POST_LOAN_BALANCE");
        m.insert(516, "INSUFFICIENT_ETH");
        m.insert(517, "UNALLOCATED_ETH");
        m.insert(518, "ETH_TRANSFER");
        m.insert(519, "CANNOT_USE_ETH_SENTINEL");
        m.insert(520, "TOKENS_MISMATCH");
        m.insert(521, "TOKEN_NOT_REGISTERED");
        m.insert(522, "TOKEN_ALREADY_REGISTERED");
        m.insert(523, "TOKENS_ALREADY_SET");
        m.insert(524, "TOKENS_LENGTH_MUST_BE_2");
        m.insert(525, "NONZERO_TOKEN_BALANCE");
        m.insert(526, "BALANCE_TOTAL_OVERFLOW");
        m.insert(527, "POOL_NO_TOKENS");
        m.insert(528, "INSUFFICIENT_FLASH_LOAN_BALANCE");
        m.insert(600, "SWAP_FEE_PERCENTAGE_TOO_HIGH");
        m.insert(601, "FLASH_LOAN_FEE_PERCENTAGE_TOO_HIGH");
        m.insert(602, "INSUFFICIENT_FLASH_LOAN_FEE_AMOUNT");
        m
    };

    static ref PANIC_CODES: HashMap<u64, &'static str> = {
        let mut m = HashMap::new();
        m.insert(0x01, "断言失败 (assert)");
        m.insert(0x11, "算术溢出/下溢");
        m.insert(0x12, "除以零");
        m.insert(0x32, "数组越界");
        m
    };
}

/// 错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertErrorType {
    /// Balancer `BAL#xxx`
    Balancer,
    /// 其它 Error(string)
    ErrorString,
    Panic,
    EmptyRevert,
    Unknown,
}

/// 解码后的错误信息
#[derive(Debug, Clone)]
pub struct DecodedRevertError {
    pub error_type: RevertErrorType,
    pub message: String,
    pub balancer_code: Option<u16>,
    /// 价格变化类错误，下一轮可能成功
    pub is_retryable: bool,
}

impl DecodedRevertError {
    fn plain(error_type: RevertErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            balancer_code: None,
            is_retryable: false,
        }
    }
}

impl fmt::Display for DecodedRevertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.balancer_code {
            Some(code) => write!(
                f,
                "BAL#{:03} ({})",
                code,
                RevertDecoder::balancer_error_name(code).unwrap_or("UNKNOWN")
            ),
            None => write!(f, "{}", self.message),
        }
    }
}

pub struct RevertDecoder;

impl RevertDecoder {
    /// 错误码对应的名称
    pub fn balancer_error_name(code: u16) -> Option<&'static str> {
        BALANCER_ERRORS.get(&code).copied()
    }

    /// 从任意文本中提取 `BAL#xxx`
    pub fn balancer_code(message: &str) -> Option<u16> {
        BAL_CODE_PATTERN
            .captures(message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// 从 ethers 错误字符串中解码
    pub fn decode_from_error_string(error: &str) -> DecodedRevertError {
        debug!("解码错误字符串: {}", error);

        if let Some(data) = Self::extract_hex_from_error(error) {
            let decoded = Self::decode_revert_data(&data);
            if decoded.error_type != RevertErrorType::Unknown {
                return decoded;
            }
        }

        Self::parse_error_message(error)
    }

    /// 解码原始 revert 数据
    pub fn decode_revert_data(data: &[u8]) -> DecodedRevertError {
        if data.is_empty() {
            return DecodedRevertError::plain(RevertErrorType::EmptyRevert, "空 revert (无错误消息)");
        }
        if data.len() < 4 {
            return DecodedRevertError::plain(
                RevertErrorType::Unknown,
                format!("数据太短，无法解析: 0x{}", hex::encode(data)),
            );
        }

        let (selector, payload) = data.split_at(4);

        if selector == SELECTOR_ERROR_STRING {
            return Self::decode_error_string(payload);
        }
        if selector == SELECTOR_PANIC {
            return Self::decode_panic(payload);
        }

        DecodedRevertError::plain(
            RevertErrorType::Unknown,
            format!("自定义错误 (选择器: 0x{})", hex::encode(selector)),
        )
    }

    fn decode_error_string(payload: &[u8]) -> DecodedRevertError {
        match abi::decode(&[abi::ParamType::String], payload) {
            Ok(tokens) => match tokens.into_iter().next() {
                Some(Token::String(msg)) => Self::parse_error_message(&msg),
                _ => DecodedRevertError::plain(RevertErrorType::ErrorString, "Error(string) 但无法解码消息"),
            },
            Err(e) => {
                warn!("解码 Error(string) 失败: {:?}", e);
                DecodedRevertError::plain(RevertErrorType::ErrorString, "Error(string) 但无法解码消息")
            }
        }
    }

    fn decode_panic(payload: &[u8]) -> DecodedRevertError {
        let code = match abi::decode(&[abi::ParamType::Uint(256)], payload) {
            Ok(tokens) => match tokens.into_iter().next() {
                Some(Token::Uint(code)) if code <= U256::from(u64::MAX) => code.as_u64(),
                _ => return DecodedRevertError::plain(RevertErrorType::Panic, "Panic 但无法解码代码"),
            },
            Err(e) => {
                warn!("解码 Panic(uint256) 失败: {:?}", e);
                return DecodedRevertError::plain(RevertErrorType::Panic, "Panic 但无法解码代码");
            }
        };

        let description = PANIC_CODES.get(&code).copied().unwrap_or("未知 Panic 代码");
        DecodedRevertError::plain(
            RevertErrorType::Panic,
            format!("Panic(0x{:02x}): {}", code, description),
        )
    }

    fn extract_hex_from_error(error: &str) -> Option<Vec<u8>> {
        HEX_PATTERNS.iter().find_map(|re| {
            let hex_str = re.captures(error)?.get(1)?.as_str();
            hex::decode(hex_str.trim_start_matches("0x")).ok()
        })
    }

    /// 直接解析错误消息
    fn parse_error_message(message: &str) -> DecodedRevertError {
        if let Some(code) = Self::balancer_code(message) {
            return DecodedRevertError {
                error_type: RevertErrorType::Balancer,
                message: message.to_string(),
                balancer_code: Some(code),
                // 额度/比例限制与价格有关
                is_retryable: matches!(code, 304 | 305 | 507),
            };
        }

        let error_type = if message.to_lowercase().contains("revert") {
            RevertErrorType::ErrorString
        } else {
            RevertErrorType::Unknown
        };
        DecodedRevertError::plain(error_type, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_string_payload(msg: &str) -> Vec<u8> {
        let mut data = SELECTOR_ERROR_STRING.to_vec();
        data.extend(abi::encode(&[Token::String(msg.to_string())]));
        data
    }

    #[test]
    fn test_balancer_code_from_text() {
        assert_eq!(RevertDecoder::balancer_code("execution reverted: BAL#507"), Some(507));
        assert_eq!(RevertDecoder::balancer_code("nonce too low"), None);
        assert_eq!(RevertDecoder::balancer_error_name(508), Some("SWAP_DEADLINE"));
    }

    #[test]
    fn test_decode_error_string_payload() {
        let decoded = RevertDecoder::decode_revert_data(&error_string_payload("BAL#304"));

        assert_eq!(decoded.error_type, RevertErrorType::Balancer);
        assert_eq!(decoded.balancer_code, Some(304));
        assert!(decoded.is_retryable);
        assert_eq!(decoded.to_string(), "BAL#304 (MAX_IN_RATIO)");
    }

    #[test]
    fn test_decode_from_embedded_hex() {
        let data = error_string_payload("BAL#500");
        let error = format!("Revert(Bytes(0x{}))", hex::encode(&data));
        let decoded = RevertDecoder::decode_from_error_string(&error);

        assert_eq!(decoded.balancer_code, Some(500));
        assert!(!decoded.is_retryable);
    }

    #[test]
    fn test_decode_panic() {
        let mut data = SELECTOR_PANIC.to_vec();
        data.extend(abi::encode(&[Token::Uint(U256::from(0x11))]));
        let decoded = RevertDecoder::decode_revert_data(&data);

        assert_eq!(decoded.error_type, RevertErrorType::Panic);
        assert!(decoded.message.contains("0x11"));
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(RevertDecoder::decode_revert_data(&[]).error_type, RevertErrorType::EmptyRevert);
        assert_eq!(
            RevertDecoder::decode_from_error_string("connection refused").error_type,
            RevertErrorType::Unknown
        );
    }
}
