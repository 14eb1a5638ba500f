use ethers::prelude::abigen;

abigen!(
    Gauge,
    r#"[
        function balanceOf(address account) external view returns (uint256)
        function earned(address account) external view returns (uint256)
        function rewardToken() external view returns (address)
    ]"#
);
