// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bond-chat contract bindings.

use alloy::{
    primitives::{Address, Bytes, B256},
    sol,
    sol_types::SolCall,
};

use super::backend::CallMsg;
use super::wrapped::{ConfidentialBackend, TransactOpts, TransportError};

// Define the bond-chat interface using alloy's sol! macro
sol! {
    interface IBondChat {
        struct MessageInfo {
            address sender;
            string message;
            uint256 timestamp;
        }

        function createBond() external;
        function addMessage(address bondAddress, uint8 tag, string message) external;
        function signBondStatus(address bondAddress) external;
        function updateBodyInfo(
            address bondAddress,
            uint32 principal,
            uint8 couponRate,
            uint32 couponDate,
            uint32 maturityDate,
            uint8 currency
        ) external;
        function updateBondHolder(address bondAddress, address holder) external;
        function updateBondStatus(address bondAddress, uint8 status) external;
        function getBondSecureDetails(address bondAddress)
            external
            view
            returns (string security, string appendix);

        event NewBondCreated(address sender, address bondAddress, uint256 timestamp);
        event BondBodyTerms(
            address bondAddress,
            uint32 principal,
            uint8 couponRate,
            uint32 couponDate,
            uint32 maturityDate,
            uint8 currency
        );
        event BondMotivation(address sender, address bondAddress, string message);
        event StatusChange(address sender, address bondAddress, uint8 status);
        event StatusSigned(address sender, address bondAddress, uint8 status);
        event StatusResigned(address sender, address bondAddress, uint8 status);
        event HolderUpdate(address bondAddress, address holder);
        event NewChatMessage(address bondAddress, MessageInfo chat);
    }
}

/// `addMessage` tags.
pub mod message_tag {
    pub const CHAT: u8 = 0;
    pub const INTRO: u8 = 1;
    pub const SECURITY: u8 = 2;
    pub const APPENDIX: u8 = 3;
}

/// State-changing bond-chat calls accepted from clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BondChatCall {
    CreateBond,
    AddMessage {
        bond: Address,
        tag: u8,
        message: String,
    },
    SignBondStatus {
        bond: Address,
    },
    UpdateBodyInfo {
        bond: Address,
        principal: u32,
        coupon_rate: u8,
        coupon_date: u32,
        maturity_date: u32,
        currency: u8,
    },
    UpdateBondHolder {
        bond: Address,
        holder: Address,
    },
    UpdateBondStatus {
        bond: Address,
        status: u8,
    },
}

impl BondChatCall {
    /// ABI-encoded calldata.
    pub fn abi_encode(&self) -> Bytes {
        let raw = match self {
            BondChatCall::CreateBond => IBondChat::createBondCall {}.abi_encode(),
            BondChatCall::AddMessage { bond, tag, message } => IBondChat::addMessageCall {
                bondAddress: *bond,
                tag: *tag,
                message: message.clone(),
            }
            .abi_encode(),
            BondChatCall::SignBondStatus { bond } => {
                IBondChat::signBondStatusCall { bondAddress: *bond }.abi_encode()
            }
            BondChatCall::UpdateBodyInfo {
                bond,
                principal,
                coupon_rate,
                coupon_date,
                maturity_date,
                currency,
            } => IBondChat::updateBodyInfoCall {
                bondAddress: *bond,
                principal: *principal,
                couponRate: *coupon_rate,
                couponDate: *coupon_date,
                maturityDate: *maturity_date,
                currency: *currency,
            }
            .abi_encode(),
            BondChatCall::UpdateBondHolder { bond, holder } => IBondChat::updateBondHolderCall {
                bondAddress: *bond,
                holder: *holder,
            }
            .abi_encode(),
            BondChatCall::UpdateBondStatus { bond, status } => IBondChat::updateBondStatusCall {
                bondAddress: *bond,
                status: *status,
            }
            .abi_encode(),
        };
        raw.into()
    }
}

/// Confidential parts of a bond, readable only by its parties.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SecureDetails {
    pub security: String,
    pub appendix: String,
}

/// Bond-chat contract bound to the confidential transport.
pub struct BondChat {
    address: Address,
    transport: ConfidentialBackend,
}

impl BondChat {
    pub fn new(address: Address, transport: ConfidentialBackend) -> Self {
        Self { address, transport }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn transport(&self) -> &ConfidentialBackend {
        &self.transport
    }

    /// Submit a state-changing call. Returns the transaction hash.
    pub async fn transact(
        &self,
        opts: &TransactOpts,
        call: &BondChatCall,
    ) -> Result<B256, TransportError> {
        self.transport
            .transact(opts, self.address, call.abi_encode())
            .await
    }

    /// Signed query for the bond's confidential details on behalf of `caller`.
    pub async fn secure_details(
        &self,
        caller: Address,
        signing_key: &[u8],
        bond: Address,
    ) -> Result<SecureDetails, TransportError> {
        let call = CallMsg {
            from: caller,
            to: self.address,
            data: IBondChat::getBondSecureDetailsCall { bondAddress: bond }
                .abi_encode()
                .into(),
            ..Default::default()
        };
        let raw = self
            .transport
            .call_contract(&call, None, Some(signing_key))
            .await?;
        let ret = IBondChat::getBondSecureDetailsCall::abi_decode_returns(&raw)
            .map_err(|e| TransportError::AbiDecode(e.to_string()))?;
        Ok(SecureDetails {
            security: ret.security,
            appendix: ret.appendix,
        })
    }
}
