//! Parser Module
//!
//! calamineを使用したワークブックの読み込み。
//! セル値は`CellValue`の閉じたバリアントに変換されます。

mod workbook;

pub(crate) use workbook::WorkbookReader;
