use ethers::prelude::abigen;

abigen!(
    Erc20,
    r#"[
        function symbol() external view returns (string)
        function decimals() external view returns (uint8)
        function totalSupply() external view returns (uint256)
        function balanceOf(address account) external view returns (uint256)
    ]"#
);
