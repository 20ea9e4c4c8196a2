use alloy::sol;
use alloy_primitives::U256;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct Erc20Info {
        bytes name;
        bytes symbol;
        uint256 decimals;
        uint256 balance;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Erc721Info {
        bytes name;
        bytes symbol;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Erc721TokenInfo {
        uint256 owner;
        bytes tokenUri;
    }

    #[sol(rpc)]
    interface AccountInfo {
        function getInfo(
            address[] erc20s,
            address[] erc721s,
            uint256[] counts,
            uint256[] erc721TokenIds
        ) external view returns (
            uint256 balance,
            uint256 blockNumber,
            Erc20Info[] erc20Infos,
            Erc721Info[] erc721Infos,
            Erc721TokenInfo[] erc721TokenInfos
        );
    }
}

/// Single-block view of an account returned by the batched `getInfo` query.
///
/// `erc20_infos` and `erc721_infos` are positionally aligned with the contract
/// address lists of the request, `erc721_token_infos` with its flattened token ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    pub balance: U256,
    pub block_number: u64,
    pub erc20_infos: Vec<Erc20Info>,
    pub erc721_infos: Vec<Erc721Info>,
    pub erc721_token_infos: Vec<Erc721TokenInfo>,
}

impl From<AccountInfo::getInfoReturn> for AccountState {
    fn from(ret: AccountInfo::getInfoReturn) -> Self {
        Self {
            balance: ret.balance,
            block_number: ret.blockNumber.saturating_to(),
            erc20_infos: ret.erc20Infos,
            erc721_infos: ret.erc721Infos,
            erc721_token_infos: ret.erc721TokenInfos,
        }
    }
}
