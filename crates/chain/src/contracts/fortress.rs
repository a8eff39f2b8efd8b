//! Fortress market, oracle, FAI and governance interfaces.

use alloy::sol;

// Derivative (fToken) markets
sol! {
    /// ERC20-backed fToken market
    interface IFToken {
        function mint(uint256 mintAmount) external returns (uint256);
        function redeem(uint256 redeemTokens) external returns (uint256);
        function redeemUnderlying(uint256 redeemAmount) external returns (uint256);
        function borrow(uint256 borrowAmount) external returns (uint256);
        function repayBorrow(uint256 repayAmount) external returns (uint256);
        function repayBorrowBehalf(address borrower, uint256 repayAmount) external returns (uint256);
        function exchangeRateCurrent() external returns (uint256);
    }
}

sol! {
    /// Native-asset fToken market (amounts travel in the transaction value)
    interface IFBnb {
        function mint() external payable;
        function repayBorrow() external payable;
        function repayBorrowBehalf(address borrower) external payable;
    }
}

// Comptroller and price oracle
sol! {
    /// Central registry of markets
    interface IComptroller {
        function oracle() external view returns (address);
        function enterMarkets(address[] calldata fTokens) external returns (uint256[] memory);
        function exitMarket(address fToken) external returns (uint256);
    }
}

sol! {
    /// Price oracle keyed by fToken address
    interface IPriceOracle {
        function getUnderlyingPrice(address fToken) external view returns (uint256);
    }
}

sol! {
    /// FAI stablecoin controller
    interface IFaiController {
        function mintFAI(uint256 mintFAIAmount) external returns (uint256);
        function repayFAI(uint256 repayFAIAmount) external returns (uint256, uint256);
    }
}

// Governance
sol! {
    /// FTS governance token (vote delegation)
    interface IFts {
        function delegate(address delegatee) external;
        function delegateBySig(address delegatee, uint256 nonce, uint256 expiry, uint8 v, bytes32 r, bytes32 s) external;
        function nonces(address account) external view returns (uint256);
        function getCurrentVotes(address account) external view returns (uint96);
    }
}

sol! {
    /// Governor (proposal voting)
    interface IGovernor {
        function castVote(uint256 proposalId, uint8 support) external;
        function castVoteBySig(uint256 proposalId, uint8 support, uint8 v, bytes32 r, bytes32 s) external;
    }
}

// EIP-712 message types
sol! {
    /// Vote delegation message signed off-chain
    #[derive(Debug, PartialEq, Eq)]
    struct Delegation {
        address delegatee;
        uint256 nonce;
        uint256 expiry;
    }

    /// Ballot message signed off-chain
    #[derive(Debug, PartialEq, Eq)]
    struct Ballot {
        uint256 proposalId;
        uint8 support;
    }
}
