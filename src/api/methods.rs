// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Supported JSON-RPC methods and their parameter schemas.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use serde_json::Value;

use crate::blockchain::BondChatCall;

/// Where a method is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// Executed against the bond-chat contract.
    Contract,
    /// Answered from the local database.
    Local,
    /// Session key negotiation on `/serverpubkey`.
    SessionKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint8,
    Uint32,
    String,
}

impl ParamType {
    fn max(&self) -> Option<u64> {
        match self {
            ParamType::Uint8 => Some(u8::MAX as u64),
            ParamType::Uint32 => Some(u32::MAX as u64),
            ParamType::Address | ParamType::String => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamType::Address => "address",
            ParamType::Uint8 => "uint8",
            ParamType::Uint32 => "uint32",
            ParamType::String => "string",
        })
    }
}

#[derive(Debug)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub class: MethodClass,
    pub params: &'static [ParamType],
}

use ParamType::{Address as A, String as S, Uint32 as U32, Uint8 as U8};

static METHODS: &[MethodDescriptor] = &[
    // Contract
    MethodDescriptor {
        name: "createBond",
        class: MethodClass::Contract,
        params: &[],
    },
    MethodDescriptor {
        name: "addMessage",
        class: MethodClass::Contract,
        params: &[A, U8, S],
    },
    MethodDescriptor {
        name: "signBondStatus",
        class: MethodClass::Contract,
        params: &[A],
    },
    MethodDescriptor {
        name: "updateBodyInfo",
        class: MethodClass::Contract,
        params: &[A, U32, U8, U32, U32, U8],
    },
    MethodDescriptor {
        name: "updateBondHolder",
        class: MethodClass::Contract,
        params: &[A, A],
    },
    MethodDescriptor {
        name: "updateBondStatus",
        class: MethodClass::Contract,
        params: &[A, U8],
    },
    MethodDescriptor {
        name: "getBondSecureDetails",
        class: MethodClass::Contract,
        params: &[A],
    },
    // Local
    MethodDescriptor {
        name: "getBonds",
        class: MethodClass::Local,
        params: &[],
    },
    MethodDescriptor {
        name: "getBondByAddress",
        class: MethodClass::Local,
        params: &[A],
    },
    MethodDescriptor {
        name: "getChats",
        class: MethodClass::Local,
        params: &[A],
    },
    // Session key
    MethodDescriptor {
        name: "getServerPubKey",
        class: MethodClass::SessionKey,
        params: &[S],
    },
];

/// Descriptor for `name`, if supported.
pub fn lookup(name: &str) -> Option<&'static MethodDescriptor> {
    METHODS.iter().find(|m| m.name == name)
}

/// A parameter after type checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Address(Address),
    Uint(u64),
    String(String),
}

impl Param {
    fn as_address(&self) -> Option<Address> {
        match self {
            Param::Address(a) => Some(*a),
            _ => None,
        }
    }

    fn as_uint<T: TryFrom<u64>>(&self) -> Option<T> {
        match self {
            Param::Uint(n) => T::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Render a raw parameter the way it appears in error messages.
fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Check `value` against `ty` and convert it.
pub fn cast_param(value: &Value, ty: ParamType) -> Result<Param, String> {
    let found = match value {
        Value::String(s) => match ty {
            ParamType::String => return Ok(Param::String(s.clone())),
            ParamType::Address => match Address::from_str(s.trim()) {
                Ok(address) => return Ok(Param::Address(address)),
                Err(_) => "string",
            },
            _ => "string",
        },
        Value::Number(n) => match ty.max() {
            Some(max) => {
                // Integral floats such as `3.0` are accepted; fractions and
                // negatives are a type mismatch.
                let raw = n.as_u64().or_else(|| {
                    n.as_f64()
                        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64)
                        .map(|f| f as u64)
                });
                match raw {
                    Some(raw) if raw <= max => return Ok(Param::Uint(raw)),
                    Some(raw) => {
                        return Err(format!("expected a max value of {max} but found {raw}"))
                    }
                    None => "number",
                }
            }
            None => "number",
        },
        _ => "unsupported",
    };
    Err(format!(
        "expected param {} to be of type {ty} but found it to be {found}",
        display_raw(value)
    ))
}

/// Contract-class request built from checked parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractRequest {
    Transact(BondChatCall),
    SecureDetails { bond: Address },
}

/// Build the contract request for `name`. `params` must already match the
/// method's schema.
pub fn contract_request(name: &str, params: &[Param]) -> Option<ContractRequest> {
    let addr = |i: usize| params.get(i).and_then(Param::as_address);
    let u8_at = |i: usize| params.get(i).and_then(Param::as_uint::<u8>);
    let u32_at = |i: usize| params.get(i).and_then(Param::as_uint::<u32>);

    let call = match name {
        "createBond" => BondChatCall::CreateBond,
        "addMessage" => BondChatCall::AddMessage {
            bond: addr(0)?,
            tag: u8_at(1)?,
            message: params.get(2)?.as_str()?.to_string(),
        },
        "signBondStatus" => BondChatCall::SignBondStatus { bond: addr(0)? },
        "updateBodyInfo" => BondChatCall::UpdateBodyInfo {
            bond: addr(0)?,
            principal: u32_at(1)?,
            coupon_rate: u8_at(2)?,
            coupon_date: u32_at(3)?,
            maturity_date: u32_at(4)?,
            currency: u8_at(5)?,
        },
        "updateBondHolder" => BondChatCall::UpdateBondHolder {
            bond: addr(0)?,
            holder: addr(1)?,
        },
        "updateBondStatus" => BondChatCall::UpdateBondStatus {
            bond: addr(0)?,
            status: u8_at(1)?,
        },
        "getBondSecureDetails" => return Some(ContractRequest::SecureDetails { bond: addr(0)? }),
        _ => return None,
    };
    Some(ContractRequest::Transact(call))
}

/// Address parameter at `index`.
pub fn address_param(params: &[Param], index: usize) -> Option<Address> {
    params.get(index).and_then(Param::as_address)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use serde_json::json;

    use super::*;

    #[test]
    fn table_has_unique_names_and_expected_classes() {
        let mut names: Vec<_> = METHODS.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), METHODS.len());

        assert_eq!(lookup("getServerPubKey").unwrap().class, MethodClass::SessionKey);
        assert_eq!(lookup("getBonds").unwrap().class, MethodClass::Local);
        assert_eq!(lookup("updateBodyInfo").unwrap().params.len(), 6);
        assert!(lookup("getBondsByStatus").is_none());
    }

    #[test]
    fn cast_accepts_matching_types() {
        let bond = address!("22bB522c7356A8a6EAbd8ebd2B48d690FcB01787");
        assert_eq!(
            cast_param(&json!("0x22bb522c7356a8a6eabd8ebd2b48d690fcb01787"), ParamType::Address),
            Ok(Param::Address(bond))
        );
        assert_eq!(cast_param(&json!(255), ParamType::Uint8), Ok(Param::Uint(255)));
        assert_eq!(cast_param(&json!(7.0), ParamType::Uint32), Ok(Param::Uint(7)));
        assert_eq!(
            cast_param(&json!("hello"), ParamType::String),
            Ok(Param::String("hello".into()))
        );
    }

    #[test]
    fn cast_reports_overflow() {
        assert_eq!(
            cast_param(&json!(256), ParamType::Uint8),
            Err("expected a max value of 255 but found 256".into())
        );
    }

    #[test]
    fn cast_reports_type_mismatch() {
        assert_eq!(
            cast_param(&json!("five"), ParamType::Uint8),
            Err("expected param five to be of type uint8 but found it to be string".into())
        );
        assert_eq!(
            cast_param(&json!(5), ParamType::String),
            Err("expected param 5 to be of type string but found it to be number".into())
        );
        assert_eq!(
            cast_param(&json!(true), ParamType::Address),
            Err("expected param true to be of type address but found it to be unsupported".into())
        );
        assert!(cast_param(&json!("0x1234"), ParamType::Address).is_err());
        assert!(cast_param(&json!(-1), ParamType::Uint8).is_err());
    }

    #[test]
    fn cast_rejects_fractional_and_negative_numbers() {
        assert_eq!(
            cast_param(&json!(7.9), ParamType::Uint32),
            Err("expected param 7.9 to be of type uint32 but found it to be number".into())
        );
        assert_eq!(
            cast_param(&json!(-2.0), ParamType::Uint8),
            Err("expected param -2.0 to be of type uint8 but found it to be number".into())
        );
        assert!(cast_param(&json!(1e30), ParamType::Uint32).is_err());
    }

    #[test]
    fn contract_requests_follow_parameter_order() {
        let bond = Address::repeat_byte(0xb0);
        let params = [
            Param::Address(bond),
            Param::Uint(1_000),
            Param::Uint(5),
            Param::Uint(4),
            Param::Uint(1_900_000_000),
            Param::Uint(2),
        ];
        assert_eq!(
            contract_request("updateBodyInfo", &params),
            Some(ContractRequest::Transact(BondChatCall::UpdateBodyInfo {
                bond,
                principal: 1_000,
                coupon_rate: 5,
                coupon_date: 4,
                maturity_date: 1_900_000_000,
                currency: 2,
            }))
        );
        assert_eq!(
            contract_request("getBondSecureDetails", &[Param::Address(bond)]),
            Some(ContractRequest::SecureDetails { bond })
        );
        assert_eq!(contract_request("getBonds", &[]), None);
    }
}
