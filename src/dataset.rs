/// 指纹数据集加载
///
/// 目录结构：
///
/// ```text
/// <dataset>/
///   train/  <prefix>_data.csv  <prefix>_data_wide.csv  <prefix>_acc.csv ...
///   test/   ...
///   valid/  ...
/// ```
///
/// 每个分区以 `*_data.csv` 文件确定采集段前缀，再按数据类型的后缀读取
/// 对应 CSV，多段数据按前缀顺序拼接。空单元格与 `nan` 读作 NaN（缺失读数）。

use ndarray::Array2;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<prefix>.+)_data\.csv$").expect("正则表达式错误"));

type Result<T> = std::result::Result<T, DatasetError>;

/// 数据集加载错误
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("读取 {path} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("解析 CSV {path} 失败: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("缺少列 '{column}'")]
    MissingColumn { column: String },

    #[error("第 {row} 行列 '{column}' 无法解析为数字: '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("分区目录 {0} 中没有任何 *_data.csv 文件")]
    EmptyPartition(PathBuf),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// 数据集分区
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Test,
    Valid,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Test, Partition::Valid];

    /// 分区目录名
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Test => "test",
            Partition::Valid => "valid",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "train" => Ok(Partition::Train),
            "test" => Ok(Partition::Test),
            "valid" => Ok(Partition::Valid),
            other => Err(format!("未知分区 '{other}'，可选 train / test / valid")),
        }
    }
}

/// 数据类型（决定 CSV 后缀与特征 / 标签列）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// 每条边的 RSSI，宽表格式，带真实坐标
    Rssi,
    /// 加速度计
    Acc,
    /// 位置
    Pos,
    /// 罗盘方位角
    Com,
}

impl ContainerKind {
    /// CSV 文件后缀（含下划线与扩展名）
    pub fn csv_suffix(&self) -> &'static str {
        match self {
            ContainerKind::Rssi => "_data_wide.csv",
            ContainerKind::Acc => "_acc.csv",
            ContainerKind::Pos => "_pos.csv",
            ContainerKind::Com => "_com.csv",
        }
    }

    /// 从表头中挑选特征列
    pub fn x_columns(&self, headers: &[String]) -> Vec<String> {
        let fixed: &[&str] = match self {
            ContainerKind::Rssi => {
                return headers
                    .iter()
                    .filter(|h| h.starts_with("edge_"))
                    .cloned()
                    .collect();
            }
            ContainerKind::Acc => &["accx", "accy", "accz"],
            ContainerKind::Pos => &["realx", "realy"],
            ContainerKind::Com => &["azimuth"],
        };
        fixed.iter().map(|s| s.to_string()).collect()
    }

    /// 标签列，无监督数据为 None
    pub fn y_columns(&self) -> Option<&'static [&'static str]> {
        match self {
            ContainerKind::Rssi => Some(&["realx", "realy"]),
            _ => None,
        }
    }
}

/// 一种数据类型在一个分区内的全部数据
#[derive(Clone, Debug)]
pub struct DataContainer {
    kind: ContainerKind,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DataContainer {
    pub fn new(kind: ContainerKind, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        DataContainer { kind, headers, rows }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 追加另一段数据，表头取并集（按首次出现顺序），缺失单元格留空
    pub fn append(&mut self, headers: &[String], rows: Vec<Vec<String>>) {
        let mut index = Vec::with_capacity(headers.len());
        for h in headers {
            let pos = match self.headers.iter().position(|existing| existing == h) {
                Some(pos) => pos,
                None => {
                    self.headers.push(h.clone());
                    for row in &mut self.rows {
                        row.push(String::new());
                    }
                    self.headers.len() - 1
                }
            };
            index.push(pos);
        }

        for row in rows {
            let mut aligned = vec![String::new(); self.headers.len()];
            for (cell, &pos) in row.into_iter().zip(&index) {
                aligned[pos] = cell;
            }
            self.rows.push(aligned);
        }
    }

    /// 特征矩阵 N×D
    pub fn x(&self) -> Result<Array2<f64>> {
        self.columns(&self.kind.x_columns(&self.headers))
    }

    /// 标签矩阵 N×2，无监督数据为 None
    pub fn y(&self) -> Result<Option<Array2<f64>>> {
        match self.kind.y_columns() {
            Some(cols) => {
                let cols: Vec<String> = cols.iter().map(|s| s.to_string()).collect();
                Ok(Some(self.columns(&cols)?))
            }
            None => Ok(None),
        }
    }

    /// 按列名取出数值矩阵
    pub fn columns(&self, names: &[String]) -> Result<Array2<f64>> {
        let index = names
            .iter()
            .map(|name| {
                self.headers
                    .iter()
                    .position(|h| h == name)
                    .ok_or_else(|| DatasetError::MissingColumn {
                        column: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut values = Vec::with_capacity(self.rows.len() * index.len());
        for (row_no, row) in self.rows.iter().enumerate() {
            for (&col, name) in index.iter().zip(names) {
                values.push(parse_cell(&row[col], row_no, name)?);
            }
        }
        Ok(Array2::from_shape_vec((self.rows.len(), index.len()), values)?)
    }
}

fn parse_cell(cell: &str, row: usize, column: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse().map_err(|_| DatasetError::InvalidNumber {
        row,
        column: column.to_string(),
        value: cell.to_string(),
    })
}

/// 扫描目录中所有 `*_data.csv` 文件，返回排序后的前缀
pub fn find_prefixes(dir: &Path) -> Result<Vec<String>> {
    let io_err = |source: std::io::Error| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut prefixes = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let name = entry.map_err(io_err)?.file_name();
        let name = name.to_string_lossy();
        if !name.ends_with("_data.csv") {
            continue;
        }
        match PREFIX_PATTERN.captures(&name) {
            Some(caps) => prefixes.push(caps["prefix"].to_string()),
            None => tracing::warn!(file = %name, "skipping unrecognized filename"),
        }
    }
    prefixes.sort();
    Ok(prefixes)
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let csv_err = |source: csv::Error| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

/// 加载一个分区中的指定数据类型
pub fn load_partition(
    dir: &Path,
    partition: Partition,
    kinds: &[ContainerKind],
) -> Result<HashMap<ContainerKind, DataContainer>> {
    let partition_dir = dir.join(partition.as_str());
    let prefixes = find_prefixes(&partition_dir)?;
    if prefixes.is_empty() {
        return Err(DatasetError::EmptyPartition(partition_dir));
    }

    let mut out = HashMap::new();
    for &kind in kinds {
        let mut container = DataContainer::new(kind, Vec::new(), Vec::new());
        for prefix in &prefixes {
            let path = partition_dir.join(format!("{prefix}{}", kind.csv_suffix()));
            let (headers, rows) = read_csv(&path)?;
            container.append(&headers, rows);
        }
        tracing::debug!(
            partition = %partition,
            kind = ?kind,
            segments = prefixes.len(),
            rows = container.len(),
            "partition loaded"
        );
        out.insert(kind, container);
    }
    Ok(out)
}

/// 加载全部分区
pub fn load_dataset(
    dir: &Path,
    kinds: &[ContainerKind],
) -> Result<HashMap<Partition, HashMap<ContainerKind, DataContainer>>> {
    Partition::ALL
        .iter()
        .map(|&p| Ok((p, load_partition(dir, p, kinds)?)))
        .collect()
}
