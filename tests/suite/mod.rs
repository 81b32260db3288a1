mod binary;
mod interaction;
