use solana_program::{program_error::ProgramError, pubkey::Pubkey};

/// Operations the vault's message surface accepts, per the external interface
/// table. Decoded from a byte-tag-prefixed payload, but the payload itself
/// carries only the business arguments — the caller address is supplied out
/// of band by whatever
/// transport delivers the message (the signer account on-chain, the sender
/// field of an async message elsewhere), not packed into the instruction data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultOperation {
    /// Any caller. `amount_base` in base-currency minor units.
    Deposit { tranche_id: u8, amount_base: u64 },
    /// Any caller. `shares_to_burn` in LP-share units.
    Withdraw { tranche_id: u8, shares_to_burn: u64 },
    /// Caller must be the tranche's registered LP-token contract.
    MintAck { tx_id: u64 },
    /// Caller must be the tranche's registered LP-token contract.
    BurnAck { tx_id: u64 },
    /// Caller must be the authorized product factory.
    DistributePremium { premium_amount: u64 },
    /// Caller must be the authorized claims processor.
    AbsorbLoss { loss_amount: u64 },
    /// Caller must be the original depositor of `tx_id`.
    RetryPayout { tx_id: u64 },
    /// Admin only.
    Pause,
    /// Admin only.
    Unpause,
    /// Admin only, one-time per tranche.
    SetTrancheToken { tranche_id: u8, address: Pubkey },
    /// Admin only.
    SetTrancheParams {
        tranche_id: u8,
        apy_min_bps: u16,
        apy_max_bps: u16,
        curve_id: u8,
        allocation_bps: u16,
    },
    /// Admin only.
    FlushEqtOverflow { target: Pubkey },
    /// Runtime-originated. `original_op` names which dispatch bounced (mint
    /// or burn) for logging; the lookup itself is keyed purely by `tx_id`.
    Bounce { tx_id: u64, original_op: u8 },
}

impl VaultOperation {
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = data.split_first().ok_or(ProgramError::InvalidInstructionData)?;

        match tag {
            0 => {
                if rest.len() < 9 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let tranche_id = rest[0];
                let amount_base = u64::from_le_bytes(rest[1..9].try_into().unwrap());
                Ok(Self::Deposit { tranche_id, amount_base })
            }
            1 => {
                if rest.len() < 9 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let tranche_id = rest[0];
                let shares_to_burn = u64::from_le_bytes(rest[1..9].try_into().unwrap());
                Ok(Self::Withdraw { tranche_id, shares_to_burn })
            }
            2 => {
                if rest.len() < 8 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let tx_id = u64::from_le_bytes(rest[0..8].try_into().unwrap());
                Ok(Self::MintAck { tx_id })
            }
            3 => {
                if rest.len() < 8 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let tx_id = u64::from_le_bytes(rest[0..8].try_into().unwrap());
                Ok(Self::BurnAck { tx_id })
            }
            4 => {
                if rest.len() < 8 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let premium_amount = u64::from_le_bytes(rest[0..8].try_into().unwrap());
                Ok(Self::DistributePremium { premium_amount })
            }
            5 => {
                if rest.len() < 8 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let loss_amount = u64::from_le_bytes(rest[0..8].try_into().unwrap());
                Ok(Self::AbsorbLoss { loss_amount })
            }
            6 => {
                if rest.len() < 8 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let tx_id = u64::from_le_bytes(rest[0..8].try_into().unwrap());
                Ok(Self::RetryPayout { tx_id })
            }
            7 => Ok(Self::Pause),
            8 => Ok(Self::Unpause),
            9 => {
                if rest.len() < 33 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let tranche_id = rest[0];
                let address = Pubkey::try_from(&rest[1..33])
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Ok(Self::SetTrancheToken { tranche_id, address })
            }
            10 => {
                if rest.len() < 8 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let tranche_id = rest[0];
                let apy_min_bps = u16::from_le_bytes(rest[1..3].try_into().unwrap());
                let apy_max_bps = u16::from_le_bytes(rest[3..5].try_into().unwrap());
                let curve_id = rest[5];
                let allocation_bps = u16::from_le_bytes(rest[6..8].try_into().unwrap());
                Ok(Self::SetTrancheParams {
                    tranche_id,
                    apy_min_bps,
                    apy_max_bps,
                    curve_id,
                    allocation_bps,
                })
            }
            11 => {
                if rest.len() < 32 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let target = Pubkey::try_from(&rest[0..32])
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Ok(Self::FlushEqtOverflow { target })
            }
            12 => {
                if rest.len() < 9 {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let tx_id = u64::from_le_bytes(rest[0..8].try_into().unwrap());
                let original_op = rest[8];
                Ok(Self::Bounce { tx_id, original_op })
            }
            _ => Err(ProgramError::InvalidInstructionData),
        }
    }
}
