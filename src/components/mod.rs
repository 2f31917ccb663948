pub mod sc16is750;
