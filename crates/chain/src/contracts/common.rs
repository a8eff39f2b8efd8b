//! ERC20 interface used by the allowance check.

use alloy::sol;

sol! {
    /// ERC20 subset needed for approvals and balances
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
