//! WavePortal contract ABI: call encoding, return decoding and `NewWave` log parsing.
//!
//! The ABI is built by hand from `ethers::abi` primitives rather than generated,
//! so only the three functions and one event the client uses are described.

use crate::types::{Account, WaveRecord};
use chrono::{DateTime, Utc};
use ethers::abi::{self, Event, EventParam, Function, Param, ParamType, StateMutability, Token};
use ethers::prelude::*;
use thiserror::Error;

/// Public WavePortal deployment.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x1fb2bbD9C38Ada3B41F78Ed0c2aeb3e3d3b601F2";

/// Gas limit the client attaches to every `wave` call.
pub const DEFAULT_WAVE_GAS_LIMIT: u64 = 300_000;

#[derive(Debug, Error)]
pub enum AbiError {
    #[error("ABI error: {0}")]
    Abi(#[from] abi::Error),
    #[error("Unexpected return shape for {0}")]
    UnexpectedShape(&'static str),
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(U256),
    #[error("Wave counter out of range: {0}")]
    CounterOutOfRange(U256),
    #[error("Log is not a NewWave event")]
    NotNewWave,
}

#[allow(deprecated)]
fn function(
    name: &str,
    inputs: Vec<Param>,
    outputs: Vec<Param>,
    state_mutability: StateMutability,
) -> Function {
    Function {
        name: name.to_string(),
        inputs,
        outputs,
        constant: None,
        state_mutability,
    }
}

fn param(name: &str, kind: ParamType) -> Param {
    Param {
        name: name.to_string(),
        kind,
        internal_type: None,
    }
}

/// `(address waver, string message, uint256 timestamp)`
fn wave_tuple() -> ParamType {
    ParamType::Tuple(vec![ParamType::Address, ParamType::String, ParamType::Uint(256)])
}

/// `wave(string _message)`
pub fn wave_function() -> Function {
    function(
        "wave",
        vec![param("_message", ParamType::String)],
        vec![],
        StateMutability::NonPayable,
    )
}

/// `getAllWaves() returns (Wave[])`
pub fn get_all_waves_function() -> Function {
    function(
        "getAllWaves",
        vec![],
        vec![param("", ParamType::Array(Box::new(wave_tuple())))],
        StateMutability::View,
    )
}

/// `getTotalWaves() returns (uint256)`
pub fn get_total_waves_function() -> Function {
    function(
        "getTotalWaves",
        vec![],
        vec![param("", ParamType::Uint(256))],
        StateMutability::View,
    )
}

/// `event NewWave(address indexed from, uint256 timestamp, string message)`
pub fn new_wave_event() -> Event {
    Event {
        name: "NewWave".to_string(),
        inputs: vec![
            EventParam {
                name: "from".to_string(),
                kind: ParamType::Address,
                indexed: true,
            },
            EventParam {
                name: "timestamp".to_string(),
                kind: ParamType::Uint(256),
                indexed: false,
            },
            EventParam {
                name: "message".to_string(),
                kind: ParamType::String,
                indexed: false,
            },
        ],
        anonymous: false,
    }
}

/// Calldata for `wave(message)`.
pub fn encode_wave(message: &str) -> Result<Vec<u8>, AbiError> {
    Ok(wave_function().encode_input(&[Token::String(message.to_string())])?)
}

pub fn encode_get_all_waves() -> Result<Vec<u8>, AbiError> {
    Ok(get_all_waves_function().encode_input(&[])?)
}

pub fn encode_get_total_waves() -> Result<Vec<u8>, AbiError> {
    Ok(get_total_waves_function().encode_input(&[])?)
}

/// Convert on-chain seconds into a UTC instant.
pub fn timestamp_from_chain(seconds: U256) -> Result<DateTime<Utc>, AbiError> {
    if seconds > U256::from(i64::MAX as u64) {
        return Err(AbiError::TimestampOutOfRange(seconds));
    }
    DateTime::from_timestamp(seconds.as_u64() as i64, 0).ok_or(AbiError::TimestampOutOfRange(seconds))
}

/// Decode the `getAllWaves()` return data, preserving contract order.
pub fn decode_all_waves(data: &[u8]) -> Result<Vec<WaveRecord>, AbiError> {
    let tokens = get_all_waves_function().decode_output(data)?;
    let entries = match tokens.into_iter().next() {
        Some(Token::Array(entries)) => entries,
        _ => return Err(AbiError::UnexpectedShape("getAllWaves")),
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            Token::Tuple(fields) => match fields.as_slice() {
                [Token::Address(waver), Token::String(message), Token::Uint(timestamp)] => Ok(WaveRecord {
                    author: Account(*waver),
                    timestamp: timestamp_from_chain(*timestamp)?,
                    message: message.clone(),
                }),
                _ => Err(AbiError::UnexpectedShape("getAllWaves entry")),
            },
            _ => Err(AbiError::UnexpectedShape("getAllWaves entry")),
        })
        .collect()
}

pub fn decode_total_waves(data: &[u8]) -> Result<u64, AbiError> {
    let tokens = get_total_waves_function().decode_output(data)?;
    match tokens.as_slice() {
        [Token::Uint(total)] if *total > U256::from(u64::MAX) => Err(AbiError::CounterOutOfRange(*total)),
        [Token::Uint(total)] => Ok(total.as_u64()),
        _ => Err(AbiError::UnexpectedShape("getTotalWaves")),
    }
}

/// topic0 of `NewWave`.
pub fn new_wave_topic() -> H256 {
    new_wave_event().signature()
}

/// Log filter for every `NewWave` emitted by `contract`.
pub fn new_wave_filter(contract: Address) -> Filter {
    Filter::new().address(contract).topic0(new_wave_topic())
}

/// Parse one `NewWave` log into a record.
pub fn decode_new_wave(log: &Log) -> Result<WaveRecord, AbiError> {
    if log.topics.first() != Some(&new_wave_topic()) || log.topics.len() < 2 {
        return Err(AbiError::NotNewWave);
    }
    let author = Address::from(log.topics[1]);
    let tokens = abi::decode(&[ParamType::Uint(256), ParamType::String], &log.data)?;
    match tokens.as_slice() {
        [Token::Uint(timestamp), Token::String(message)] => Ok(WaveRecord {
            author: Account(author),
            timestamp: timestamp_from_chain(*timestamp)?,
            message: message.clone(),
        }),
        _ => Err(AbiError::UnexpectedShape("NewWave")),
    }
}
