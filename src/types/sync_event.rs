use alloy::sol;

sol!(
    event Sync(uint112 reserve0, uint112 reserve1);
);
